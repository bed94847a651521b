//! Redirect targets for a process's standard streams.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a standard stream comes from or goes to.
///
/// A stream with no redirect inherits the caller's stream.
#[derive(Debug, Clone)]
pub enum Redirect {
    /// A file-system path, opened when the stage is spawned.
    ///
    /// Output paths are truncated unless the redirect is in append mode.
    Path(PathBuf),

    /// A file the caller already holds open.
    ///
    /// The engine duplicates the descriptor for the child and never closes
    /// the caller's copy. It must stay open until the stage has started.
    Handle(Arc<File>),

    /// The null device.
    Discard,

    /// An OS pipe whose other end is handed back on the process handle.
    Pipe,
}

impl Redirect {
    /// Redirect to a path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Redirect::Path(path.into())
    }

    /// Redirect to a caller-owned open file.
    pub fn handle(file: File) -> Self {
        Redirect::Handle(Arc::new(file))
    }
}

impl PartialEq for Redirect {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Redirect::Path(a), Redirect::Path(b)) => a == b,
            (Redirect::Handle(a), Redirect::Handle(b)) => Arc::ptr_eq(a, b),
            (Redirect::Discard, Redirect::Discard) => true,
            (Redirect::Pipe, Redirect::Pipe) => true,
            _ => false,
        }
    }
}

impl From<&str> for Redirect {
    fn from(path: &str) -> Self {
        Redirect::Path(PathBuf::from(path))
    }
}

impl From<String> for Redirect {
    fn from(path: String) -> Self {
        Redirect::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Redirect {
    fn from(path: &Path) -> Self {
        Redirect::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Redirect {
    fn from(path: PathBuf) -> Self {
        Redirect::Path(path)
    }
}

impl From<&PathBuf> for Redirect {
    fn from(path: &PathBuf) -> Self {
        Redirect::Path(path.clone())
    }
}

impl From<File> for Redirect {
    fn from(file: File) -> Self {
        Redirect::handle(file)
    }
}

impl From<Arc<File>> for Redirect {
    fn from(file: Arc<File>) -> Self {
        Redirect::Handle(file)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Redirect::Path(path) => {
                let text = path.to_string_lossy();
                match shlex::try_quote(&text) {
                    Ok(quoted) => write!(f, "{}", quoted),
                    Err(_) => write!(f, "{:?}", text),
                }
            }
            Redirect::Handle(_) => write!(f, "[handle]"),
            Redirect::Discard => write!(f, "/dev/null"),
            Redirect::Pipe => write!(f, "[pipe]"),
        }
    }
}
