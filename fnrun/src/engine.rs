//! Function invocation: resolve, run in an isolated child, map the exit.
//!
//! The engine holds no mutable state. Each [`Engine::invoke`] call owns its
//! own child process and pipes, so invocations of the same or different
//! functions may run concurrently from any number of threads without
//! coordination. Nothing about an invocation is retained after it returns.

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::core::outcome::{ExecutionResult, InvocationPhase};
use crate::error::{FunctionError, FunctionResult};
use crate::io::config::FnrunConfig;
use crate::io::process::CommandOutput;
use crate::io::runtime::{ProcessRuntime, RunRequest, Runtime};
use crate::io::store::FunctionStore;

#[derive(Debug, Clone)]
pub struct Engine<R = ProcessRuntime> {
    store: FunctionStore,
    runtime: R,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl Engine<ProcessRuntime> {
    /// Build a process-backed engine from config, opening the store under
    /// `base` (the directory holding the config file).
    pub fn from_config(cfg: &FnrunConfig, base: &Path) -> anyhow::Result<Self> {
        cfg.validate()?;
        let root = cfg.store_root(base);
        let store = FunctionStore::open_with_extension(&root, &cfg.extension)
            .with_context(|| format!("open function store {}", root.display()))?;
        let runtime = ProcessRuntime::new(cfg.interpreter.clone())?;
        Ok(Self::new(
            store,
            runtime,
            cfg.invoke_timeout(),
            cfg.output_limit_bytes,
        ))
    }
}

impl<R: Runtime> Engine<R> {
    pub fn new(
        store: FunctionStore,
        runtime: R,
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            store,
            runtime,
            timeout,
            output_limit_bytes,
        }
    }

    pub fn store(&self) -> &FunctionStore {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the function registered as `name` with `input` on stdin.
    ///
    /// Returns stdout on a zero exit. A nonzero exit (or death by signal)
    /// yields [`FunctionError::ExecutionFailed`] carrying stderr. An
    /// unregistered name fails with [`FunctionError::NotFound`] before any
    /// process is spawned.
    #[instrument(skip_all, fields(name = %name, input_bytes = input.len()))]
    pub fn invoke(&self, name: &str, input: &[u8]) -> FunctionResult<ExecutionResult> {
        let mut phase = InvocationPhase::Pending;

        let resolved = match self.store.resolve(name) {
            Ok(resolved) => resolved,
            Err(err) => {
                advance(&mut phase, InvocationPhase::Failed);
                debug!(kind = err.kind(), "resolution failed");
                return Err(err);
            }
        };
        advance(&mut phase, InvocationPhase::Resolved);

        let request = RunRequest {
            name: resolved.name.clone(),
            source_path: resolved.path,
            workdir: self.store.root().to_path_buf(),
            input: input.to_vec(),
            timeout: self.timeout,
            output_limit_bytes: self.output_limit_bytes,
        };
        advance(&mut phase, InvocationPhase::Running);
        let output = match self.runtime.run(request) {
            Ok(output) => output,
            Err(err) => {
                advance(&mut phase, InvocationPhase::Failed);
                warn!(err = %format!("{err:#}"), "function could not be run");
                return Err(FunctionError::io(
                    format!("run function {}", resolved.name),
                    io::Error::other(err),
                ));
            }
        };

        let result = self.classify(output);
        match &result {
            Ok(success) => {
                advance(&mut phase, InvocationPhase::Succeeded);
                info!(
                    stdout_bytes = success.stdout.len(),
                    stdout_truncated = success.stdout_truncated,
                    "invocation succeeded"
                );
            }
            Err(err) => {
                advance(&mut phase, InvocationPhase::Failed);
                info!(kind = err.kind(), "invocation failed");
            }
        }
        result
    }

    fn classify(&self, output: CommandOutput) -> FunctionResult<ExecutionResult> {
        if output.timed_out {
            return Err(FunctionError::Timeout {
                timeout: self.timeout,
            });
        }
        if output.status.success() {
            return Ok(ExecutionResult {
                stdout: output.stdout,
                stdout_truncated: output.stdout_truncated,
            });
        }
        Err(FunctionError::ExecutionFailed {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

fn advance(phase: &mut InvocationPhase, next: InvocationPhase) {
    debug_assert!(
        phase.can_advance_to(next),
        "illegal invocation transition {phase} -> {next}"
    );
    debug!(from = %phase, to = %next, "invocation phase");
    *phase = next;
}
