//! Resolution of a composition tree into running processes.
//!
//! Leaves spawn one process each. Pipe chains are flattened and every
//! inter-stage pipe is created before the first stage spawns, so no stage
//! can block on a sibling that does not exist yet. And/Or nodes always wait
//! on their left branch before deciding whether the right branch exists at
//! all.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::core::command::Command;
use crate::core::options::ProcessOptions;
use crate::core::tree::Tree;

use super::error::ExecError;
use super::handle::ProcessHandle;
use super::stdio::{self, Direction, Endpoint};

type LaunchFuture<'a> = Pin<Box<dyn Future<Output = Result<ProcessHandle, ExecError>> + Send + 'a>>;

/// Stream endpoints handed down to a subtree.
///
/// `None` means the subtree falls back to its stored redirects, then to
/// the caller's own streams.
#[derive(Debug, Default)]
pub(crate) struct Streams {
    pub(crate) stdin: Option<Endpoint>,
    pub(crate) stdout: Option<Endpoint>,
}

/// Spawn the processes for `tree` and return a handle on the final stage
/// that ran.
///
/// Only And/Or left branches are waited on here; everything else is left
/// running for the caller to wait on.
pub(crate) fn launch<'a>(tree: &'a Tree, streams: Streams, options: &'a ProcessOptions) -> LaunchFuture<'a> {
    Box::pin(async move {
        match tree {
            Tree::Leaf(command) => spawn_leaf(command, streams, options),
            Tree::Pipe(..) => launch_pipe(tree, streams, options).await,
            Tree::And(left, right) => launch_chain(left, right, true, streams, options).await,
            Tree::Or(left, right) => launch_chain(left, right, false, streams, options).await,
        }
    })
}

fn spawn_leaf(command: &Command, streams: Streams, options: &ProcessOptions) -> Result<ProcessHandle, ExecError> {
    let stdin = stdio::select(streams.stdin, command.input(), false);
    let stdout = stdio::select(streams.stdout, command.output(), command.append());

    let mut cmd = tokio::process::Command::new(command.program());
    cmd.args(command.args());

    if options.clears_env() {
        cmd.env_clear();
    }
    for (key, value) in options.vars().iter() {
        cmd.env(key, value);
    }
    if let Some(dir) = options.dir() {
        cmd.current_dir(dir);
    }

    if let Some(endpoint) = stdin {
        cmd.stdin(endpoint.into_stdio(Direction::Input)?);
    }
    if let Some(endpoint) = stdout {
        cmd.stdout(endpoint.into_stdio(Direction::Output)?);
    }

    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: command.program().to_string(),
        source,
    })?;
    // `cmd` still holds our copies of any files and pipe ends; they are
    // closed when it drops at the end of this function.
    debug!(
        program = %command.program(),
        args = ?command.args(),
        pid = ?child.id(),
        "spawned stage"
    );

    Ok(ProcessHandle::new(command.clone(), child))
}

async fn launch_pipe(tree: &Tree, streams: Streams, options: &ProcessOptions) -> Result<ProcessHandle, ExecError> {
    let stages = tree.pipe_stages();
    let count = stages.len();

    let mut plans: Vec<Streams> = (0..count).map(|_| Streams::default()).collect();
    for i in 1..count {
        let (reader, writer) = os_pipe::pipe()?;
        plans[i - 1].stdout = Some(Endpoint::Writer(writer));
        plans[i].stdin = Some(Endpoint::Reader(reader));
    }
    if let Some(first) = plans.first_mut() {
        first.stdin = streams.stdin;
    }
    if let Some(last) = plans.last_mut() {
        last.stdout = streams.stdout;
    }

    let mut started: Vec<ProcessHandle> = Vec::with_capacity(count);
    let mut work = stages.into_iter().zip(plans);
    while let Some((stage, plan)) = work.next() {
        match launch(stage, plan, options).await {
            Ok(handle) => started.push(handle),
            Err(e) => {
                // Close the remaining pipe ends first so started stages see
                // EOF or EPIPE, then reap them.
                drop(work);
                for handle in started {
                    handle.abort().await;
                }
                return Err(e);
            }
        }
    }

    let mut last = started.pop().ok_or_else(|| ExecError::Config("empty pipe chain".into()))?;
    for earlier in started.into_iter().rev() {
        last.adopt_upstream(earlier);
    }
    Ok(last)
}

async fn launch_chain(
    left: &Tree,
    right: &Tree,
    on_success: bool,
    streams: Streams,
    options: &ProcessOptions,
) -> Result<ProcessHandle, ExecError> {
    let Streams { stdin, stdout } = streams;
    let operator = if on_success { "&&" } else { "||" };

    let mut first = launch(
        left,
        Streams {
            stdin,
            stdout: None,
        },
        options,
    )
    .await?;
    // The decision is made on the raw code; the left branch's own check
    // policy plays no part.
    let code = first.wait_or_kill().await?;

    if (code == 0) != on_success {
        debug!(
            operator,
            code,
            skipped = %right,
            "short-circuited chain"
        );
        return Ok(first);
    }

    launch(
        right,
        Streams {
            stdin: None,
            stdout,
        },
        options,
    )
    .await
}
