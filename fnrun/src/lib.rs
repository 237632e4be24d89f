//! Minimal function-as-a-service runtime.
//!
//! Clients register named sources, invoke them by name with arbitrary input,
//! and remove them. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure logic (name grammar, input rendering, invocation
//!   phases). No I/O.
//! - **[`io`]**: Side-effecting operations (the on-disk [`FunctionStore`],
//!   config files, child processes).
//!
//! [`Engine`] ties the two together: it resolves a function through the store
//! and runs it in a fresh child process per invocation.

pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::name::FunctionName;
pub use crate::core::outcome::ExecutionResult;
pub use crate::engine::Engine;
pub use crate::error::{FunctionError, FunctionResult};
pub use crate::io::store::{FunctionStore, ResolvedFunction};
