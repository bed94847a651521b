//! Errors raised while submitting a tree for execution.

use std::time::Duration;
use thiserror::Error;

use crate::core::command::CheckPolicy;

/// Errors that can occur while running a composition tree.
///
/// None of these are retried: external processes may have side effects.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A redirect target could not be opened or duplicated.
    #[error("cannot redirect to {target}: {source}")]
    Redirect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The runner configuration is invalid. Raised before anything spawns.
    #[error("invalid runner configuration: {0}")]
    Config(String),

    /// A checked stage exited with an unexpected code.
    #[error("command `{command}` exited with code {code}, expected {expected}")]
    CommandFailed {
        /// The final stage that ran, in shell notation.
        command: String,
        /// The actual exit code.
        code: i32,
        /// The policy it failed.
        expected: CheckPolicy,
    },

    /// Reading from or waiting on a process failed.
    #[error("process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Captured output was not valid UTF-8.
    #[error("captured output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// An explicit `wait_timeout` elapsed. The process is still running.
    #[error("process still running after {0:?}")]
    Timeout(Duration),

    /// Line streaming was requested from a process without a connected stdout.
    #[error("process stdout is not connected to a pipe")]
    NoStdout,
}

impl ExecError {
    /// Check if this error is a failed exit-code check.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, ExecError::CommandFailed { .. })
    }

    /// The exit code carried by a command failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
