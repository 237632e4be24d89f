//! Test-only helpers for building shell-backed stores and engines.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use crate::engine::Engine;
use crate::io::config::{FnrunConfig, write_config};
use crate::io::runtime::ProcessRuntime;
use crate::io::store::FunctionStore;

/// Prints a fixed greeting and exits 0.
pub const HELLO_SCRIPT: &str = "printf hello\n";
/// Writes to both streams and exits 1.
pub const BOOM_SCRIPT: &str = "printf partial\nprintf boom >&2\nexit 1\n";
/// Copies stdin to stdout.
pub const ECHO_SCRIPT: &str = "cat\n";

/// Temporary fnrun project whose functions are `/bin/sh` scripts.
pub struct TestHost {
    dir: TempDir,
    pub config: FnrunConfig,
}

impl TestHost {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = FnrunConfig {
            extension: "sh".to_string(),
            interpreter: vec!["sh".to_string()],
            invoke_timeout_secs: 10,
            ..FnrunConfig::default()
        };
        Ok(Self { dir, config })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("fnrun.toml")
    }

    /// Persist `config` as `fnrun.toml` in the project directory.
    pub fn write_config(&self) -> Result<()> {
        write_config(&self.config_path(), &self.config)
    }

    pub fn store(&self) -> Result<FunctionStore> {
        Ok(FunctionStore::open_with_extension(
            self.config.store_root(self.path()),
            &self.config.extension,
        )?)
    }

    pub fn engine(&self) -> Result<Engine<ProcessRuntime>> {
        Engine::from_config(&self.config, self.path())
    }

    /// Engine with a sub-second timeout, for exercising the kill path quickly.
    pub fn engine_with_timeout(&self, timeout: Duration) -> Result<Engine<ProcessRuntime>> {
        Ok(Engine::new(
            self.store()?,
            ProcessRuntime::new(self.config.interpreter.clone())?,
            timeout,
            self.config.output_limit_bytes,
        ))
    }
}
