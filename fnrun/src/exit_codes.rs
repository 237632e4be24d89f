//! Stable exit codes for fnrun CLI commands.

use crate::error::FunctionError;

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid name, config or arguments, or an I/O failure.
pub const INVALID: i32 = 1;
/// The named function is not registered.
pub const NOT_FOUND: i32 = 2;
/// The function ran and exited nonzero.
pub const EXECUTION_FAILED: i32 = 3;
/// The function exceeded the invocation timeout and was killed.
pub const TIMEOUT: i32 = 4;

pub fn for_error(err: &FunctionError) -> i32 {
    match err {
        FunctionError::NotFound(_) => NOT_FOUND,
        FunctionError::ExecutionFailed { .. } => EXECUTION_FAILED,
        FunctionError::Timeout { .. } => TIMEOUT,
        FunctionError::InvalidName { .. } | FunctionError::Io { .. } => INVALID,
    }
}
