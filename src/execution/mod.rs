//! Process execution.
//!
//! This module turns composition trees into running OS processes: the
//! engine wires standard streams and decides spawn order, the runner applies
//! wait, capture and check policy, and handles expose the results.

mod engine;
mod error;
mod handle;
mod runner;
mod stdio;

pub use error::ExecError;
pub use handle::{LineStream, ProcessHandle};
pub use runner::{Runner, lines};
