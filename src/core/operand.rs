//! Combinator operands and the coercion rule.
//!
//! Combinators accept anything convertible into an [`Operand`]: an explicit
//! [`Command`] or [`Tree`], shell text, or an argument vector. Raw values
//! are coerced into a [`Command`] whose check policy is copied from the
//! operand directly beside it in the same combinator call. Nothing else in
//! the tree is consulted, so coercion is always resolvable locally.

use std::path::{Path, PathBuf};

use super::command::{CheckPolicy, Command};
use super::error::BuildError;
use super::tree::Tree;

/// A value appearing on one side of a combinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// An explicit tree (a descriptor is a single-leaf tree).
    Tree(Tree),
    /// Shell text, split with POSIX word-splitting rules.
    Shell(String),
    /// An argument vector: program followed by arguments.
    Argv(Vec<String>),
    /// A path-like value. Only valid as a redirect target, so coercing it
    /// into a command always fails.
    Path(PathBuf),
}

/// Which side of a combinator a neighbouring operand sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Operand {
    /// Returns true for explicit trees and descriptors.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Operand::Tree(_))
    }

    /// The check policy this operand lends to a raw neighbour.
    ///
    /// For an explicit tree this is the policy of its leaf nearest the
    /// neighbour: the rightmost leaf when the neighbour sits to the right,
    /// the leftmost when it sits to the left. Raw operands lend nothing.
    ///
    /// The lookup is local to the adjacent tree's edge leaf. A chain does
    /// not carry a policy of its own taken from its first command, so in
    /// `pipe(pipe(a, b.checked()), "c")` the raw `c` is checked because `b`
    /// is, whatever `a`'s policy.
    pub(crate) fn lent_policy(&self, neighbour: Side) -> Option<CheckPolicy> {
        match self {
            Operand::Tree(tree) => {
                let leaf = match neighbour {
                    Side::Right => tree.last_leaf(),
                    Side::Left => tree.first_leaf(),
                };
                Some(leaf.check_policy())
            }
            _ => None,
        }
    }

    /// Resolve into a tree, coercing raw values with `policy`.
    pub fn into_tree(self, policy: CheckPolicy) -> Result<Tree, BuildError> {
        let command = match self {
            Operand::Tree(tree) => return Ok(tree),
            Operand::Shell(text) => Command::from_shell(&text)?,
            Operand::Argv(argv) => Command::from_argv(argv)?,
            Operand::Path(path) => return Err(BuildError::PathAsCommand(path)),
        };
        Ok(Tree::Leaf(command.with_check(policy)))
    }
}

/// Resolve both operands of a combinator, applying the coercion rule.
pub(crate) fn coerce_pair(
    left: Operand,
    right: Operand,
) -> Result<(Tree, Tree), BuildError> {
    let from_left = left.lent_policy(Side::Right).unwrap_or_default();
    let from_right = right.lent_policy(Side::Left).unwrap_or_default();

    let left = left.into_tree(from_right)?;
    let right = right.into_tree(from_left)?;
    Ok((left, right))
}

impl From<Tree> for Operand {
    fn from(tree: Tree) -> Self {
        Operand::Tree(tree)
    }
}

impl From<&Tree> for Operand {
    fn from(tree: &Tree) -> Self {
        Operand::Tree(tree.clone())
    }
}

impl From<Command> for Operand {
    fn from(command: Command) -> Self {
        Operand::Tree(Tree::Leaf(command))
    }
}

impl From<&Command> for Operand {
    fn from(command: &Command) -> Self {
        Operand::Tree(Tree::Leaf(command.clone()))
    }
}

impl From<&str> for Operand {
    fn from(text: &str) -> Self {
        Operand::Shell(text.to_string())
    }
}

impl From<String> for Operand {
    fn from(text: String) -> Self {
        Operand::Shell(text)
    }
}

impl From<&String> for Operand {
    fn from(text: &String) -> Self {
        Operand::Shell(text.clone())
    }
}

impl From<Vec<String>> for Operand {
    fn from(argv: Vec<String>) -> Self {
        Operand::Argv(argv)
    }
}

impl From<Vec<&str>> for Operand {
    fn from(argv: Vec<&str>) -> Self {
        Operand::Argv(argv.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Operand {
    fn from(argv: &[&str]) -> Self {
        Operand::Argv(argv.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Operand {
    fn from(argv: [&str; N]) -> Self {
        Operand::Argv(argv.iter().map(|s| s.to_string()).collect())
    }
}

impl From<PathBuf> for Operand {
    fn from(path: PathBuf) -> Self {
        Operand::Path(path)
    }
}

impl From<&Path> for Operand {
    fn from(path: &Path) -> Self {
        Operand::Path(path.to_path_buf())
    }
}
