//! fnrun command-line interface.
//!
//! Reads `fnrun.toml` (or `--config`), opens the function store it points at,
//! and runs one store or engine operation per invocation.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;

use fnrun::core::input::render_input;
use fnrun::error::FunctionError;
use fnrun::exit_codes;
use fnrun::io::config::{
    DEFAULT_CONFIG_PATH, FnrunConfig, config_base_dir, load_config, write_config,
};
use fnrun::{Engine, FunctionStore, logging};

#[derive(Parser)]
#[command(
    name = "fnrun",
    version,
    about = "Register, invoke and remove named functions"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config (if missing) and create the store directory.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Register FILE (or `-` for stdin) as function NAME, replacing any previous source.
    Put { name: String, file: PathBuf },
    /// Run function NAME and print its stdout.
    Invoke {
        name: String,
        /// Raw text written to the function's stdin.
        #[arg(long, conflicts_with = "json")]
        input: Option<String>,
        /// JSON value rendered to stdin (strings verbatim, others as compact JSON).
        #[arg(long)]
        json: Option<String>,
    },
    /// Delete function NAME.
    Remove { name: String },
    /// Print registered function names, one per line.
    List,
}

fn main() {
    logging::init("warn");
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            let code = err
                .downcast_ref::<FunctionError>()
                .map_or(exit_codes::INVALID, exit_codes::for_error);
            std::process::exit(code);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Put { name, file } => cmd_put(&cli.config, &name, &file),
        Command::Invoke { name, input, json } => cmd_invoke(&cli.config, &name, input, json),
        Command::Remove { name } => cmd_remove(&cli.config, &name),
        Command::List => cmd_list(&cli.config),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if force || !config_path.exists() {
        write_config(config_path, &FnrunConfig::default())
            .with_context(|| format!("write {}", config_path.display()))?;
    }
    let cfg = load_config(config_path)?;
    let root = cfg.store_root(&config_base_dir(config_path));
    FunctionStore::open_with_extension(&root, &cfg.extension)?;
    println!("{}", root.display());
    Ok(exit_codes::OK)
}

fn cmd_put(config_path: &Path, name: &str, file: &Path) -> Result<i32> {
    let source = if file == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("read source from stdin")?;
        buf
    } else {
        fs::read(file).with_context(|| format!("read source {}", file.display()))?
    };
    let engine = open_engine(config_path)?;
    engine.store().put(name, &source)?;
    Ok(exit_codes::OK)
}

fn cmd_invoke(
    config_path: &Path,
    name: &str,
    input: Option<String>,
    json: Option<String>,
) -> Result<i32> {
    let payload = match (input, json) {
        (Some(text), _) => text,
        (None, Some(raw)) => {
            let value: Value = serde_json::from_str(&raw).context("parse --json value")?;
            render_input(Some(&value))
        }
        (None, None) => render_input(None),
    };
    let engine = open_engine(config_path)?;
    match engine.invoke(name, payload.as_bytes()) {
        Ok(result) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&result.stdout).context("write stdout")?;
            stdout.flush().context("flush stdout")?;
            Ok(exit_codes::OK)
        }
        Err(FunctionError::ExecutionFailed { stderr, exit_code }) => {
            debug!(?exit_code, "function failed");
            eprint!("{stderr}");
            Ok(exit_codes::EXECUTION_FAILED)
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_remove(config_path: &Path, name: &str) -> Result<i32> {
    let engine = open_engine(config_path)?;
    engine.store().remove(name)?;
    Ok(exit_codes::OK)
}

fn cmd_list(config_path: &Path) -> Result<i32> {
    let engine = open_engine(config_path)?;
    for name in engine.store().list()? {
        println!("{name}");
    }
    Ok(exit_codes::OK)
}

fn open_engine(config_path: &Path) -> Result<Engine> {
    let cfg = load_config(config_path)?;
    Engine::from_config(&cfg, &config_base_dir(config_path))
}
