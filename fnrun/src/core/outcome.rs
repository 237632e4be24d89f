//! Invocation results and lifecycle phases.

use std::fmt;

use serde::Serialize;

/// Output of a successful invocation. Standard error is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    /// Bytes of stdout dropped beyond the configured output limit.
    pub stdout_truncated: usize,
}

impl ExecutionResult {
    /// Stdout decoded as UTF-8, replacing invalid sequences.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Lifecycle of one invocation.
///
/// `Pending -> Resolved -> Running -> {Succeeded, Failed}`. A failed
/// resolution moves straight from `Pending` to `Failed`; there is no edge out
/// of a terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    Pending,
    Resolved,
    Running,
    Succeeded,
    Failed,
}

impl InvocationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: InvocationPhase) -> bool {
        use InvocationPhase::{Failed, Pending, Resolved, Running, Succeeded};
        matches!(
            (self, next),
            (Pending, Resolved)
                | (Pending, Failed)
                | (Resolved, Running)
                | (Resolved, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::InvocationPhase::{Failed, Pending, Resolved, Running, Succeeded};
    use super::*;

    #[test]
    fn stdout_text_is_lossy() {
        let result = ExecutionResult {
            stdout: vec![b'h', b'i', 0xff],
            stdout_truncated: 0,
        };
        assert_eq!(result.stdout_text(), "hi\u{fffd}");
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(Pending.can_advance_to(Resolved));
        assert!(Resolved.can_advance_to(Running));
        assert!(Running.can_advance_to(Succeeded));
        assert!(Running.can_advance_to(Failed));
    }

    #[test]
    fn missing_function_skips_resolved() {
        assert!(Pending.can_advance_to(Failed));
        assert!(!Pending.can_advance_to(Running));
    }

    #[test]
    fn terminal_phases_have_no_exits() {
        for terminal in [Succeeded, Failed] {
            assert!(terminal.is_terminal());
            for next in [Pending, Resolved, Running, Succeeded, Failed] {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }
}
