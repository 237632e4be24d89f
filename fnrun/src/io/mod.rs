//! Side-effecting helpers: filesystem store, config and process execution.

pub mod config;
pub mod process;
pub mod runtime;
pub mod store;
