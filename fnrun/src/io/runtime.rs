//! Runtime abstraction for function execution.
//!
//! The [`Runtime`] trait decouples the engine from how a resolved function is
//! actually run. [`ProcessRuntime`] spawns one interpreter process per call;
//! tests substitute scripted runtimes that return canned output.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::name::FunctionName;
use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Parameters for a single run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub name: FunctionName,
    /// Path of the stored source, appended to the interpreter command.
    pub source_path: PathBuf,
    /// Working directory for the child.
    pub workdir: PathBuf,
    /// Bytes written to the child's stdin before it is closed.
    pub input: Vec<u8>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

pub trait Runtime {
    /// Run the function to completion (or timeout) and return its raw output.
    fn run(&self, request: RunRequest) -> Result<CommandOutput>;
}

/// Runs each function as `<interpreter...> <source_path>` in a fresh child.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    interpreter: Vec<String>,
}

impl ProcessRuntime {
    pub fn new(interpreter: Vec<String>) -> Result<Self> {
        if interpreter.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("interpreter must name a program"));
        }
        Ok(Self { interpreter })
    }

    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    fn command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.interpreter[0]);
        cmd.args(&self.interpreter[1..])
            .arg(&request.source_path)
            .current_dir(&request.workdir);
        cmd
    }
}

impl Runtime for ProcessRuntime {
    #[instrument(skip_all, fields(name = %request.name, program = %self.interpreter[0]))]
    fn run(&self, request: RunRequest) -> Result<CommandOutput> {
        info!(source = %request.source_path.display(), "starting function process");
        let cmd = self.command(&request);
        let name = request.name.clone();
        let output = run_command_with_timeout(
            cmd,
            request.input,
            request.timeout,
            request.output_limit_bytes,
        )
        .with_context(|| format!("run function {name}"))?;
        debug!(exit_code = ?output.status.code(), timed_out = output.timed_out, "function process exited");
        Ok(output)
    }
}
