//! fnrun HTTP server: register, run and delete functions over JSON.

mod page;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fnrun::Engine;
use fnrun::io::config::{DEFAULT_CONFIG_PATH, config_base_dir, load_config};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "fnrun-server")]
#[command(about = "HTTP interface for registering and invoking fnrun functions")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fnrun_server=info".parse()?)
                .add_directive("fnrun=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    let engine = Engine::from_config(&cfg, &config_base_dir(&args.config))
        .context("initialize engine")?;
    info!(
        store = %engine.store().root().display(),
        interpreter = ?cfg.interpreter,
        timeout_secs = cfg.invoke_timeout_secs,
        "starting fnrun-server"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router().layer(cors).with_state(AppState::new(engine));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
