//! Composition trees.
//!
//! A [`Tree`] combines command descriptors with pipes (`|`), conjunctions
//! (`&&`) and disjunctions (`||`). Trees are plain immutable values: building
//! one never runs anything, and the same tree can be submitted any number of
//! times, each submission spawning its own independent processes.
//!
//! ```rust
//! use pipework::{pipe, and_then, Command};
//!
//! let count = pipe("cat data.txt", "sort -u")
//!     .and_then(|t| t.pipe(Command::new("wc").with_arg("-l")))
//!     .unwrap();
//! assert_eq!(count.to_string(), "cat data.txt | sort -u | wc -l");
//!
//! let guarded = and_then("test -f data.txt", &count).unwrap();
//! assert_eq!(guarded.to_string(), "test -f data.txt && cat data.txt | sort -u | wc -l");
//! ```

use std::fmt;
use std::sync::Arc;

use super::command::{CheckPolicy, Command};
use super::error::BuildError;
use super::operand::{Operand, coerce_pair};
use super::redirect::Redirect;

/// An immutable composition of command descriptors.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    /// A single command.
    Leaf(Command),
    /// Left's stdout feeds right's stdin.
    Pipe(Arc<Tree>, Arc<Tree>),
    /// Run right only if left exits with code zero.
    And(Arc<Tree>, Arc<Tree>),
    /// Run right only if left exits with a non-zero code.
    Or(Arc<Tree>, Arc<Tree>),
}

/// Pipe `left`'s stdout into `right`'s stdin.
pub fn pipe(left: impl Into<Operand>, right: impl Into<Operand>) -> Result<Tree, BuildError> {
    let (left, right) = coerce_pair(left.into(), right.into())?;
    Ok(Tree::Pipe(Arc::new(left), Arc::new(right)))
}

/// Run `right` only if `left` succeeds (`left && right`).
pub fn and_then(left: impl Into<Operand>, right: impl Into<Operand>) -> Result<Tree, BuildError> {
    let (left, right) = coerce_pair(left.into(), right.into())?;
    Ok(Tree::And(Arc::new(left), Arc::new(right)))
}

/// Run `right` only if `left` fails (`left || right`).
pub fn or_else(left: impl Into<Operand>, right: impl Into<Operand>) -> Result<Tree, BuildError> {
    let (left, right) = coerce_pair(left.into(), right.into())?;
    Ok(Tree::Or(Arc::new(left), Arc::new(right)))
}

impl Tree {
    /// Fluent form of [`pipe`].
    pub fn pipe(self, right: impl Into<Operand>) -> Result<Tree, BuildError> {
        pipe(self, right)
    }

    /// Fluent form of [`and_then`].
    pub fn and_then(self, right: impl Into<Operand>) -> Result<Tree, BuildError> {
        and_then(self, right)
    }

    /// Fluent form of [`or_else`].
    pub fn or_else(self, right: impl Into<Operand>) -> Result<Tree, BuildError> {
        or_else(self, right)
    }

    /// Return a new tree whose final stage writes stdout to `target`.
    ///
    /// A leaf is redirected directly and a pipe redirects its rightmost
    /// stage. Conditional chains are rejected because only one branch runs.
    pub fn redirect_output(
        &self,
        target: impl Into<Redirect>,
        append: bool,
    ) -> Result<Tree, BuildError> {
        self.redirect_output_with(target.into(), append)
    }

    fn redirect_output_with(&self, target: Redirect, append: bool) -> Result<Tree, BuildError> {
        match self {
            Tree::Leaf(command) => Ok(Tree::Leaf(command.with_output(target, append))),
            Tree::Pipe(left, right) => Ok(Tree::Pipe(
                left.clone(),
                Arc::new(right.redirect_output_with(target, append)?),
            )),
            Tree::And(..) | Tree::Or(..) => Err(BuildError::AmbiguousRedirect {
                op: self.operator(),
                stream: "stdout",
            }),
        }
    }

    /// Return a new tree whose first stage reads stdin from `target`.
    ///
    /// A leaf is redirected directly and a pipe redirects its leftmost
    /// stage. Conditional chains are rejected.
    pub fn redirect_input(&self, target: impl Into<Redirect>) -> Result<Tree, BuildError> {
        self.redirect_input_with(target.into())
    }

    fn redirect_input_with(&self, target: Redirect) -> Result<Tree, BuildError> {
        match self {
            Tree::Leaf(command) => Ok(Tree::Leaf(command.with_input(target))),
            Tree::Pipe(left, right) => Ok(Tree::Pipe(
                Arc::new(left.redirect_input_with(target)?),
                right.clone(),
            )),
            Tree::And(..) | Tree::Or(..) => Err(BuildError::AmbiguousRedirect {
                op: self.operator(),
                stream: "stdin",
            }),
        }
    }

    /// Return a new tree with `policy` set on the final stage of a leaf or
    /// pipe. Conditional chains set it on both branches' final stages, since
    /// either may be the last to run.
    pub fn with_check(&self, policy: impl Into<CheckPolicy>) -> Tree {
        self.with_check_policy(policy.into())
    }

    fn with_check_policy(&self, policy: CheckPolicy) -> Tree {
        match self {
            Tree::Leaf(command) => Tree::Leaf(command.with_check(policy)),
            Tree::Pipe(left, right) => {
                Tree::Pipe(left.clone(), Arc::new(right.with_check_policy(policy)))
            }
            Tree::And(left, right) => Tree::And(
                Arc::new(left.with_check_policy(policy)),
                Arc::new(right.with_check_policy(policy)),
            ),
            Tree::Or(left, right) => Tree::Or(
                Arc::new(left.with_check_policy(policy)),
                Arc::new(right.with_check_policy(policy)),
            ),
        }
    }

    /// The descriptor if this tree is a single leaf.
    pub fn as_leaf(&self) -> Option<&Command> {
        match self {
            Tree::Leaf(command) => Some(command),
            _ => None,
        }
    }

    /// The leftmost leaf.
    pub fn first_leaf(&self) -> &Command {
        match self {
            Tree::Leaf(command) => command,
            Tree::Pipe(left, _) | Tree::And(left, _) | Tree::Or(left, _) => left.first_leaf(),
        }
    }

    /// The rightmost leaf.
    pub fn last_leaf(&self) -> &Command {
        match self {
            Tree::Leaf(command) => command,
            Tree::Pipe(_, right) | Tree::And(_, right) | Tree::Or(_, right) => right.last_leaf(),
        }
    }

    /// Flatten a pipe chain into its ordered stages.
    ///
    /// Left- and right-leaning nestings flatten to the same list. A
    /// non-pipe tree is a single stage.
    pub fn pipe_stages(&self) -> Vec<&Tree> {
        let mut stages = Vec::new();
        self.collect_stages(&mut stages);
        stages
    }

    fn collect_stages<'a>(&'a self, stages: &mut Vec<&'a Tree>) {
        match self {
            Tree::Pipe(left, right) => {
                left.collect_stages(stages);
                right.collect_stages(stages);
            }
            other => stages.push(other),
        }
    }

    /// All leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Command>) {
        match self {
            Tree::Leaf(command) => out.push(command),
            Tree::Pipe(left, right) | Tree::And(left, right) | Tree::Or(left, right) => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Tree::Leaf(_) => "",
            Tree::Pipe(..) => "|",
            Tree::And(..) => "&&",
            Tree::Or(..) => "||",
        }
    }

    fn is_conditional(&self) -> bool {
        matches!(self, Tree::And(..) | Tree::Or(..))
    }
}

impl From<Command> for Tree {
    fn from(command: Command) -> Self {
        Tree::Leaf(command)
    }
}

impl From<&Command> for Tree {
    fn from(command: &Command) -> Self {
        Tree::Leaf(command.clone())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Leaf(command) => write!(f, "{}", command),
            Tree::Pipe(left, right) => {
                // Pipes bind tighter than && and ||.
                write_operand(f, left, left.is_conditional())?;
                write!(f, " | ")?;
                write_operand(f, right, right.is_conditional())
            }
            Tree::And(left, right) | Tree::Or(left, right) => {
                // && and || are left-associative with equal precedence.
                write_operand(f, left, false)?;
                write!(f, " {} ", self.operator())?;
                write_operand(f, right, right.is_conditional())
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, tree: &Tree, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", tree)
    } else {
        write!(f, "{}", tree)
    }
}
