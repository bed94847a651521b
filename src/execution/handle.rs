//! Handles on submitted processes.
//!
//! A [`ProcessHandle`] represents the final stage that ran for one
//! submission, together with any earlier pipe stages that still need to be
//! reaped. Exit codes, connected pipe endpoints and drained output are all
//! reached through it.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::core::command::{CheckPolicy, Command};

use super::error::ExecError;

/// A running or finished submission.
///
/// Dropping a handle does not kill its processes.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Descriptor of the final stage
    command: Command,
    /// The final stage
    child: Child,
    /// Earlier pipe stages, reaped once the final stage exits
    upstream: Vec<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    /// Bytes drained from a connected stdout while waiting
    output: Vec<u8>,
    status: Option<ExitStatus>,
}

impl ProcessHandle {
    pub(crate) fn new(command: Command, mut child: Child) -> Self {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        Self {
            command,
            child,
            upstream: Vec::new(),
            stdin,
            stdout,
            output: Vec::new(),
            status: None,
        }
    }

    /// Take over the processes of an earlier pipe stage.
    ///
    /// Their stdout is already wired to the next stage. A connected stdin
    /// on the first stage moves over so the caller can still write to it.
    pub(crate) fn adopt_upstream(&mut self, earlier: ProcessHandle) {
        let ProcessHandle {
            child,
            upstream,
            stdin,
            ..
        } = earlier;
        if self.stdin.is_none() {
            self.stdin = stdin;
        }
        let mut adopted = upstream;
        adopted.push(child);
        adopted.append(&mut self.upstream);
        self.upstream = adopted;
    }

    /// Descriptor of the final stage that ran.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// OS process id of the final stage, while it is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit code of the final stage, once waited on.
    ///
    /// A process killed by a signal reports the negated signal number.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.map(exit_code)
    }

    /// Take the writable end of a connected stdin pipe.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Take the readable end of a connected stdout pipe.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Output drained from a connected stdout during [`wait`](Self::wait).
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Wait for the final stage to exit and return its exit code.
    ///
    /// Our end of a connected stdin is closed first, and a connected stdout
    /// is drained into [`output`](Self::output) so a full pipe can never
    /// stall the child. Earlier pipe stages are reaped afterwards without
    /// affecting the result. Waiting again returns the same code.
    pub async fn wait(&mut self) -> Result<i32, ExecError> {
        if let Some(status) = self.status {
            return Ok(exit_code(status));
        }

        drop(self.stdin.take());
        if let Some(stdout) = self.stdout.as_mut() {
            stdout.read_to_end(&mut self.output).await?;
            self.stdout = None;
        }

        let status = self.child.wait().await?;
        self.status = Some(status);
        self.reap_upstream();

        Ok(exit_code(status))
    }

    /// Wait with a deadline, using the runtime's timer.
    ///
    /// On timeout the processes are left running; kill them with
    /// [`kill`](Self::kill) if required.
    pub async fn wait_timeout(&mut self, limit: Duration) -> Result<i32, ExecError> {
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::Timeout(limit)),
        }
    }

    /// Wait like [`wait`](Self::wait), but kill every process of the
    /// submission if waiting fails.
    pub(crate) async fn wait_or_kill(&mut self) -> Result<i32, ExecError> {
        let result = self.wait().await;
        self.kill_on_error(result).await
    }

    async fn kill_on_error<T>(&mut self, result: Result<T, ExecError>) -> Result<T, ExecError> {
        if let Err(e) = &result {
            tracing::debug!(program = %self.command.program(), error = %e, "killing submission after failed wait");
            if let Err(kill_error) = self.kill().await {
                tracing::debug!(program = %self.command.program(), error = %kill_error, "failed to kill submission");
            }
        }
        result
    }

    /// Kill every process of this submission and reap them.
    pub async fn kill(&mut self) -> Result<(), ExecError> {
        if self.status.is_none() {
            self.child.kill().await?;
            self.status = Some(self.child.wait().await?);
        }
        for stage in &mut self.upstream {
            let _ = stage.kill().await;
        }
        self.upstream.clear();
        Ok(())
    }

    /// Validate the exit code against `policy`.
    ///
    /// A handle that has not been waited on always passes.
    pub fn check(&self, policy: CheckPolicy) -> Result<(), ExecError> {
        match self.exit_code() {
            Some(code) if !policy.accepts(code) => Err(ExecError::CommandFailed {
                command: self.command.to_string(),
                code,
                expected: policy,
            }),
            _ => Ok(()),
        }
    }

    /// Stream stdout line by line.
    ///
    /// Requires a connected stdout that has not been taken or drained.
    pub fn lines(mut self) -> Result<LineStream, ExecError> {
        let stdout = self.stdout.take().ok_or(ExecError::NoStdout)?;
        Ok(LineStream {
            lines: Some(BufReader::new(stdout).lines()),
            handle: self,
        })
    }

    /// Tear down a partially started submission.
    pub(crate) async fn abort(mut self) {
        if let Err(e) = self.kill().await {
            tracing::debug!(program = %self.command.program(), error = %e, "failed to kill stage during abort");
        }
    }

    fn reap_upstream(&mut self) {
        for mut stage in self.upstream.drain(..) {
            match stage.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(code = exit_code(status), "reaped upstream stage");
                }
                // Still draining or blocked: reap it in the background so it
                // never becomes a zombie and never gates the result.
                _ => {
                    tokio::spawn(async move {
                        if let Ok(status) = stage.wait().await {
                            tracing::debug!(code = exit_code(status), "reaped upstream stage");
                        }
                    });
                }
            }
        }
    }
}

/// A lazy, finite sequence of stdout lines from one submission.
///
/// The stream cannot be restarted; submit the tree again to read again.
/// When the last line has been read the process is waited on.
#[derive(Debug)]
pub struct LineStream {
    handle: ProcessHandle,
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl LineStream {
    /// Read the next line without its terminator, or `None` at the end.
    pub async fn next_line(&mut self) -> Result<Option<String>, ExecError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        match lines.next_line().await? {
            Some(line) => Ok(Some(line)),
            None => {
                self.lines = None;
                self.handle.wait().await?;
                Ok(None)
            }
        }
    }

    /// Read all remaining lines.
    pub async fn collect_lines(mut self) -> Result<Vec<String>, ExecError> {
        let mut out = Vec::new();
        while let Some(line) = self.next_line().await? {
            out.push(line);
        }
        Ok(out)
    }

    /// Exit code, available once the stream is exhausted.
    pub fn exit_code(&self) -> Option<i32> {
        self.handle.exit_code()
    }

    pub fn into_handle(self) -> ProcessHandle {
        self.handle
    }
}

pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
