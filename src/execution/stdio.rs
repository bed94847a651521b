//! Resolution of redirect targets into child process streams.
//!
//! Precedence for each stream of a leaf: an endpoint handed down by the
//! engine (pipe wiring or an invocation-time override), then the leaf's
//! stored redirect, then the caller's own stream.

use std::fs::{File, OpenOptions};
use std::process::Stdio;

use crate::core::redirect::Redirect;

use super::error::ExecError;

/// Which standard stream an endpoint is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Input,
    Output,
}

/// A concrete stream source or sink for one stage.
///
/// Pipe ends are owned: moving one into a child's `Stdio` and dropping the
/// spawn command closes the engine's copy.
#[derive(Debug)]
pub(crate) enum Endpoint {
    Target { redirect: Redirect, append: bool },
    Reader(os_pipe::PipeReader),
    Writer(os_pipe::PipeWriter),
}

impl Endpoint {
    pub(crate) fn target(redirect: Redirect, append: bool) -> Self {
        Endpoint::Target { redirect, append }
    }

    /// Open or duplicate the underlying resource for a child process.
    pub(crate) fn into_stdio(self, direction: Direction) -> Result<Stdio, ExecError> {
        match self {
            Endpoint::Reader(reader) => Ok(reader.into()),
            Endpoint::Writer(writer) => Ok(writer.into()),
            Endpoint::Target { redirect, append } => open_target(&redirect, append, direction),
        }
    }
}

/// Pick the endpoint for one stream of a leaf, or `None` to inherit.
pub(crate) fn select(
    handed_down: Option<Endpoint>,
    stored: Option<&Redirect>,
    stored_append: bool,
) -> Option<Endpoint> {
    handed_down.or_else(|| stored.map(|r| Endpoint::target(r.clone(), stored_append)))
}

fn open_target(redirect: &Redirect, append: bool, direction: Direction) -> Result<Stdio, ExecError> {
    tracing::trace!(redirect = %redirect, ?direction, append, "resolving redirect");
    let redirect_error = |source: std::io::Error| ExecError::Redirect {
        target: redirect.to_string(),
        source,
    };

    match redirect {
        Redirect::Path(path) => {
            let file = match direction {
                Direction::Input => File::open(path),
                Direction::Output => OpenOptions::new()
                    .write(true)
                    .create(true)
                    .append(append)
                    .truncate(!append)
                    .open(path),
            }
            .map_err(redirect_error)?;
            Ok(Stdio::from(file))
        }
        // The caller keeps its descriptor; the child gets a duplicate.
        Redirect::Handle(file) => {
            let dup = file.try_clone().map_err(redirect_error)?;
            Ok(Stdio::from(dup))
        }
        Redirect::Discard => Ok(Stdio::null()),
        Redirect::Pipe => Ok(Stdio::piped()),
    }
}
