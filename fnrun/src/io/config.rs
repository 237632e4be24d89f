//! fnrun configuration stored in `fnrun.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "fnrun.toml";

/// Runtime configuration (TOML).
///
/// Missing fields default to values that reproduce a plain Python function
/// host: sources saved as `functions/<name>.py` and run with `python3`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FnrunConfig {
    /// Directory holding registered function sources. Relative paths resolve
    /// against the directory containing the config file.
    pub store_dir: PathBuf,

    /// File extension for stored sources (without the dot).
    pub extension: String,

    /// Program and leading arguments used to run a function; the source path
    /// is appended as the final argument.
    pub interpreter: Vec<String>,

    /// Wall-clock budget for one invocation, in seconds.
    pub invoke_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for FnrunConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("functions"),
            extension: "py".to_string(),
            interpreter: vec!["python3".to_string()],
            invoke_timeout_secs: 30,
            output_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

impl FnrunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store_dir.as_os_str().is_empty() {
            return Err(anyhow!("store_dir must be non-empty"));
        }
        if self.extension.is_empty() || !self.extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(anyhow!("extension must be non-empty and alphanumeric"));
        }
        if self.interpreter.is_empty() || self.interpreter[0].trim().is_empty() {
            return Err(anyhow!("interpreter must be a non-empty array"));
        }
        if self.invoke_timeout_secs == 0 {
            return Err(anyhow!("invoke_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }

    /// Resolve `store_dir` against `base` unless it is already absolute.
    pub fn store_root(&self, base: &Path) -> PathBuf {
        if self.store_dir.is_absolute() {
            self.store_dir.clone()
        } else {
            base.join(&self.store_dir)
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FnrunConfig::default()`.
pub fn load_config(path: &Path) -> Result<FnrunConfig> {
    if !path.exists() {
        let cfg = FnrunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FnrunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Directory that relative config paths resolve against.
pub fn config_base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FnrunConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = config_base_dir(path);
    fs::create_dir_all(&parent)
        .with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FnrunConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("fnrun.toml");
        let cfg = FnrunConfig {
            interpreter: vec!["sh".to_string()],
            extension: "sh".to_string(),
            ..FnrunConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("fnrun.toml");
        fs::write(&path, "invoke_timeout_secs = 5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.invoke_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.interpreter, vec!["python3"]);
    }

    #[test]
    fn rejects_zero_timeout_and_empty_interpreter() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("fnrun.toml");
        fs::write(&path, "invoke_timeout_secs = 0\n").expect("write");
        assert!(load_config(&path).is_err());

        fs::write(&path, "interpreter = []\n").expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn store_root_resolves_relative_to_base() {
        let cfg = FnrunConfig::default();
        assert_eq!(
            cfg.store_root(Path::new("/srv/app")),
            PathBuf::from("/srv/app/functions")
        );
        assert_eq!(config_base_dir(Path::new("fnrun.toml")), PathBuf::from("."));
    }
}
