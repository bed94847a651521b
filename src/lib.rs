//! pipework - declarative composition and execution of external-process
//! pipelines.
//!
//! Commands are immutable descriptors. Combinators join them into trees
//! with pipe (`|`), and-then (`&&`) and or-else (`||`) semantics, and a
//! [`Runner`] decides at submission time whether to wait, capture or
//! check.
//!
//! ```no_run
//! use pipework::{and_then, pipe, Command, Runner};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let sorted = pipe("cat data.txt", Command::new("sort").checked())?;
//! let text = Runner::capture().submit(&sorted).await?;
//!
//! and_then("test -f data.txt", "echo present")?.run().await?;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod execution;

pub use config::{
    ConfigError, Pipeline, PipelineBuilder, RunMode, YamlLoader, load_pipeline,
    load_pipelines_from_directory,
};
pub use core::command::{CheckPolicy, Command};
pub use core::error::BuildError;
pub use core::operand::Operand;
pub use core::options::{Environment, ProcessOptions};
pub use core::redirect::Redirect;
pub use core::tree::{Tree, and_then, or_else, pipe};
pub use execution::{ExecError, LineStream, ProcessHandle, Runner, lines};
