//! Deterministic, pure logic shared by the store and engine.
//!
//! Core modules must be free of I/O side effects.

pub mod input;
pub mod name;
pub mod outcome;
