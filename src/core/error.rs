//! Errors raised while building commands and composition trees.
//!
//! Building is pure: nothing here touches the operating system, so these
//! errors always describe a malformed description rather than a failed run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while constructing a [`Command`](super::command::Command)
/// or combining operands into a [`Tree`](super::tree::Tree).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The operand contained no program name.
    #[error("command has no program name")]
    EmptyCommand,

    /// Shell text could not be split into words (unbalanced quote or
    /// trailing escape).
    #[error("cannot split shell text into words: {0:?}")]
    Unparseable(String),

    /// A path-like value was used where a command was expected.
    ///
    /// Paths are only valid as redirect targets.
    #[error("path {0:?} is a redirect target, not a command")]
    PathAsCommand(PathBuf),

    /// A stream redirect was applied to a conditional chain.
    ///
    /// Only one branch of an `&&` / `||` node runs, so the caller must
    /// redirect the intended branch directly.
    #[error("cannot redirect {stream} of a `{op}` chain; redirect a branch instead")]
    AmbiguousRedirect {
        /// The operator of the offending node (`&&` or `||`).
        op: &'static str,
        /// Which stream was being redirected.
        stream: &'static str,
    },
}
