//! Runner configuration: the policy applied when a tree is submitted.
//!
//! A [`Runner`] decides whether to wait, whether to capture stdout, which
//! check policy gates the result and how the result is projected. Three
//! presets cover the common cases:
//!
//! | Preset | Waits | Captures | Returns |
//! |---|---|---|---|
//! | [`Runner::run`] | yes | no | [`ProcessHandle`] |
//! | [`Runner::background`] | no | no | [`ProcessHandle`] |
//! | [`Runner::capture`] | yes | yes | `String` |
//!
//! ```no_run
//! use pipework::{pipe, Runner};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = pipe("ls -1", "wc -l")?;
//! let count: usize = Runner::capture()
//!     .from_str(|text| text.trim().parse().unwrap_or(0))
//!     .submit(&tree)
//!     .await?;
//! # let _ = count;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::command::CheckPolicy;
use crate::core::options::ProcessOptions;
use crate::core::redirect::Redirect;
use crate::core::tree::Tree;

use super::engine::{self, Streams};
use super::error::ExecError;
use super::handle::{LineStream, ProcessHandle};
use super::stdio::Endpoint;

type HandleFn<T> = Arc<dyn Fn(ProcessHandle) -> Result<T, ExecError> + Send + Sync>;
type OutputFn<T> = Arc<dyn Fn(Vec<u8>) -> Result<T, ExecError> + Send + Sync>;

/// How a finished submission becomes the runner's result.
enum Projection<T> {
    /// Applied to the live handle.
    Handle(HandleFn<T>),
    /// Applied to the fully drained stdout. Requires waiting.
    Output(OutputFn<T>),
}

fn identity(handle: ProcessHandle) -> Result<ProcessHandle, ExecError> {
    Ok(handle)
}

fn decode(bytes: Vec<u8>) -> Result<String, ExecError> {
    Ok(String::from_utf8(bytes)?)
}

impl<T> Clone for Projection<T> {
    fn clone(&self) -> Self {
        match self {
            Projection::Handle(f) => Projection::Handle(Arc::clone(f)),
            Projection::Output(f) => Projection::Output(Arc::clone(f)),
        }
    }
}

/// Invocation-time execution policy.
///
/// Runners are values: every `with_*` call returns a new runner, and one
/// runner can submit any number of trees, each submission independent.
pub struct Runner<T> {
    wait: bool,
    capture: bool,
    /// Overrides the policy of the last stage that actually runs.
    check: Option<CheckPolicy>,
    stdin: Option<Redirect>,
    stdout: Option<(Redirect, bool)>,
    options: ProcessOptions,
    projection: Projection<T>,
}

impl<T> Clone for Runner<T> {
    fn clone(&self) -> Self {
        Self {
            wait: self.wait,
            capture: self.capture,
            check: self.check,
            stdin: self.stdin.clone(),
            stdout: self.stdout.clone(),
            options: self.options.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<T> fmt::Debug for Runner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projection = match self.projection {
            Projection::Handle(_) => "handle",
            Projection::Output(_) => "output",
        };
        f.debug_struct("Runner")
            .field("wait", &self.wait)
            .field("capture", &self.capture)
            .field("check", &self.check)
            .field("stdin", &self.stdin)
            .field("stdout", &self.stdout)
            .field("options", &self.options)
            .field("projection", &projection)
            .finish()
    }
}

impl Runner<ProcessHandle> {
    /// Wait for completion, check, and return the handle.
    pub fn run() -> Self {
        Self::with_projection(true, false, Projection::Handle(Arc::new(identity)))
    }

    /// Return immediately with a live handle. No check is applied.
    pub fn background() -> Self {
        Self::with_projection(false, false, Projection::Handle(Arc::new(identity)))
    }
}

impl Runner<String> {
    /// Wait, check, and return stdout decoded as UTF-8.
    pub fn capture() -> Self {
        Self::with_projection(
            true,
            true,
            Projection::Output(Arc::new(decode)),
        )
    }
}

impl<T> Runner<T> {
    fn with_projection(wait: bool, capture: bool, projection: Projection<T>) -> Self {
        Self {
            wait,
            capture,
            check: None,
            stdin: None,
            stdout: None,
            options: ProcessOptions::default(),
            projection,
        }
    }

    fn project<U>(self, capture: bool, projection: Projection<U>) -> Runner<U> {
        Runner {
            wait: self.wait,
            capture,
            check: self.check,
            stdin: self.stdin,
            stdout: self.stdout,
            options: self.options,
            projection,
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Connect the final stage's stdout to a pipe and drain it while waiting.
    ///
    /// Output projections read the drained bytes, so turning capture off
    /// under one is rejected at submission.
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Override the check policy of the last stage that actually runs.
    pub fn with_check(mut self, policy: impl Into<CheckPolicy>) -> Self {
        self.check = Some(policy.into());
        self
    }

    /// Redirect the first stage's stdin for this submission only.
    pub fn with_stdin(mut self, target: impl Into<Redirect>) -> Self {
        self.stdin = Some(target.into());
        self
    }

    /// Redirect the final stage's stdout for this submission only.
    pub fn with_stdout(mut self, target: impl Into<Redirect>, append: bool) -> Self {
        self.stdout = Some((target.into(), append));
        self
    }

    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    /// Project captured stdout decoded as UTF-8. Implies capture.
    pub fn from_str<U, F>(self, f: F) -> Runner<U>
    where
        F: Fn(String) -> U + Send + Sync + 'static,
    {
        self.project(
            true,
            Projection::Output(Arc::new(move |bytes: Vec<u8>| -> Result<U, ExecError> {
                Ok(f(decode(bytes)?))
            })),
        )
    }

    /// Project captured stdout as raw bytes. Implies capture.
    pub fn from_bytes<U, F>(self, f: F) -> Runner<U>
    where
        F: Fn(Vec<u8>) -> U + Send + Sync + 'static,
    {
        self.project(
            true,
            Projection::Output(Arc::new(move |bytes: Vec<u8>| -> Result<U, ExecError> {
                Ok(f(bytes))
            })),
        )
    }

    /// Project the process handle. Capture is left as configured.
    pub fn from_process<U, F>(self, f: F) -> Runner<U>
    where
        F: Fn(ProcessHandle) -> U + Send + Sync + 'static,
    {
        let capture = self.capture;
        self.project(
            capture,
            Projection::Handle(Arc::new(move |handle: ProcessHandle| -> Result<U, ExecError> {
                Ok(f(handle))
            })),
        )
    }

    pub fn waits(&self) -> bool {
        self.wait
    }

    pub fn captures(&self) -> bool {
        self.capture
    }

    pub fn check_override(&self) -> Option<CheckPolicy> {
        self.check
    }

    /// Reject combinations that cannot produce a result.
    ///
    /// Runs before anything is spawned.
    pub fn validate(&self) -> Result<(), ExecError> {
        if !self.wait && self.capture {
            return Err(ExecError::Config(
                "capturing output requires waiting for the process".into(),
            ));
        }
        if !self.wait && matches!(self.projection, Projection::Output(_)) {
            return Err(ExecError::Config(
                "an output projection requires waiting for the process".into(),
            ));
        }
        if !self.capture && matches!(self.projection, Projection::Output(_)) {
            return Err(ExecError::Config(
                "an output projection requires capturing stdout".into(),
            ));
        }
        if self.capture && self.stdout.is_some() {
            return Err(ExecError::Config(
                "stdout cannot be both captured and redirected".into(),
            ));
        }
        Ok(())
    }

    /// Reject a connected stdin that could never reach the caller.
    ///
    /// The first branch of a conditional chain is waited on inside the
    /// submission, which closes our end of its stdin before any handle is
    /// returned.
    fn validate_stdin(&self, tree: &Tree) -> Result<(), ExecError> {
        let connected = match &self.stdin {
            Some(target) => matches!(target, Redirect::Pipe),
            None => matches!(tree.first_leaf().input(), Some(Redirect::Pipe)),
        };
        if connected && starts_with_chain(tree) {
            return Err(ExecError::Config(format!(
                "cannot connect stdin of `{tree}`: its first stage is a conditional chain"
            )));
        }
        Ok(())
    }

    /// Execute `tree` under this policy.
    ///
    /// When waiting, the applicable check policy is the override if set,
    /// else the policy stored on the final stage that actually ran.
    pub async fn submit(&self, tree: &Tree) -> Result<T, ExecError> {
        self.validate()?;
        self.validate_stdin(tree)?;

        let stdout = if self.capture {
            Some(Endpoint::target(Redirect::Pipe, false))
        } else {
            self.stdout
                .clone()
                .map(|(target, append)| Endpoint::target(target, append))
        };
        let streams = Streams {
            stdin: self.stdin.clone().map(|target| Endpoint::target(target, false)),
            stdout,
        };

        let mut handle = engine::launch(tree, streams, &self.options).await?;

        if self.wait {
            handle.wait_or_kill().await?;
            let policy = self
                .check
                .unwrap_or_else(|| handle.command().check_policy());
            handle.check(policy)?;
        }

        match &self.projection {
            Projection::Handle(f) => f(handle),
            Projection::Output(f) => f(handle.into_output()),
        }
    }
}

/// Whether the first stage of `tree` is an `&&` / `||` node.
fn starts_with_chain(tree: &Tree) -> bool {
    match tree {
        Tree::Leaf(_) => false,
        Tree::And(..) | Tree::Or(..) => true,
        Tree::Pipe(left, _) => starts_with_chain(left),
    }
}

impl Tree {
    /// Submit with [`Runner::run`].
    pub async fn run(&self) -> Result<ProcessHandle, ExecError> {
        Runner::run().submit(self).await
    }

    /// Submit with [`Runner::capture`].
    pub async fn capture(&self) -> Result<String, ExecError> {
        Runner::capture().submit(self).await
    }

    /// Submit with [`Runner::background`].
    pub async fn background(&self) -> Result<ProcessHandle, ExecError> {
        Runner::background().submit(self).await
    }
}

/// Start `tree` in the background and stream its stdout line by line.
pub async fn lines(tree: &Tree) -> Result<LineStream, ExecError> {
    Runner::background()
        .with_stdout(Redirect::Pipe, false)
        .submit(tree)
        .await?
        .lines()
}
