//! Error taxonomy for store and engine operations.
//!
//! Every failure of `put`, `remove`, `resolve` or `invoke` is returned as a
//! [`FunctionError`]. None are retried. Mapping to exit codes or HTTP statuses
//! is left to the caller.

use std::io;
use std::time::Duration;

use crate::core::name::NameError;

pub type FunctionResult<T> = Result<T, FunctionError>;

#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("invalid function name {name:?}: {reason}")]
    InvalidName { name: String, reason: NameError },

    #[error("function not found: {0}")]
    NotFound(String),

    /// The child exited nonzero or was killed by a signal. `stderr` is the
    /// child's captured error stream, verbatim.
    #[error("function exited with status {}: {stderr}", display_code(.exit_code))]
    ExecutionFailed {
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("function timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl FunctionError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable short identifier for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "invalid_name",
            Self::NotFound(_) => "not_found",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Timeout { .. } => "timeout",
            Self::Io { .. } => "io",
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
