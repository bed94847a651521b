//! Command descriptors.
//!
//! A [`Command`] describes one external program invocation: the program,
//! its arguments, default stream redirects and the exit-code check applied
//! when the command is the last stage to run. Descriptors are values:
//! every `with_*` method returns a new descriptor and leaves the receiver
//! untouched, so a descriptor can be shared between any number of trees.
//!
//! # Quick Start
//!
//! ```rust
//! use pipework::{CheckPolicy, Command};
//!
//! let ls = Command::new("ls").with_args(["-l", "/tmp"]);
//! let checked = ls.with_check(CheckPolicy::ExpectZero);
//!
//! // The original is unchanged.
//! assert_eq!(ls.check_policy(), CheckPolicy::NoCheck);
//! assert_eq!(checked.args(), &["-l", "/tmp"]);
//!
//! // Shell text and argument vectors are split into program + args.
//! let grep = Command::from_shell("grep -i 'hello world'").unwrap();
//! assert_eq!(grep.program(), "grep");
//! assert_eq!(grep.args(), &["-i", "hello world"]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BuildError;
use super::redirect::Redirect;

/// Rule for validating a process's exit code after it has been waited on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPolicy {
    /// Any exit code is accepted.
    #[default]
    NoCheck,
    /// The exit code must be zero.
    ExpectZero,
    /// The exit code must equal the given value.
    ExpectCode(i32),
}

impl CheckPolicy {
    /// Returns true if `code` satisfies this policy.
    pub fn accepts(self, code: i32) -> bool {
        match self {
            CheckPolicy::NoCheck => true,
            CheckPolicy::ExpectZero => code == 0,
            CheckPolicy::ExpectCode(expected) => code == expected,
        }
    }

    /// Returns true if this policy can ever reject an exit code.
    pub fn is_checked(self) -> bool {
        !matches!(self, CheckPolicy::NoCheck)
    }
}

impl From<bool> for CheckPolicy {
    fn from(checked: bool) -> Self {
        if checked {
            CheckPolicy::ExpectZero
        } else {
            CheckPolicy::NoCheck
        }
    }
}

impl From<i32> for CheckPolicy {
    fn from(code: i32) -> Self {
        CheckPolicy::ExpectCode(code)
    }
}

impl fmt::Display for CheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckPolicy::NoCheck => write!(f, "any exit code"),
            CheckPolicy::ExpectZero => write!(f, "exit code 0"),
            CheckPolicy::ExpectCode(code) => write!(f, "exit code {}", code),
        }
    }
}

/// An immutable description of one external program invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Program to execute
    program: String,
    /// Positional arguments
    args: Vec<String>,
    /// Default stdin; `None` inherits
    input: Option<Redirect>,
    /// Default stdout; `None` inherits
    output: Option<Redirect>,
    /// Open a path output in append mode
    append: bool,
    /// Exit-code check when this is the last stage run
    check: CheckPolicy,
}

impl Command {
    /// Create a descriptor for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: None,
            output: None,
            append: false,
            check: CheckPolicy::NoCheck,
        }
    }

    /// Split shell text into a program and arguments using POSIX quoting
    /// rules.
    pub fn from_shell(text: &str) -> Result<Self, BuildError> {
        let words = shlex::split(text).ok_or_else(|| BuildError::Unparseable(text.to_string()))?;
        Self::from_argv(words)
    }

    /// Build from an argument vector whose first element is the program.
    pub fn from_argv<I, S>(argv: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut words = argv.into_iter().map(Into::into);
        let program = words
            .next()
            .filter(|p: &String| !p.is_empty())
            .ok_or(BuildError::EmptyCommand)?;
        Ok(Self {
            args: words.collect(),
            ..Self::new(program)
        })
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the default input redirect.
    pub fn input(&self) -> Option<&Redirect> {
        self.input.as_ref()
    }

    /// Get the default output redirect.
    pub fn output(&self) -> Option<&Redirect> {
        self.output.as_ref()
    }

    /// Whether a path output is opened in append mode.
    pub fn append(&self) -> bool {
        self.append
    }

    /// Get the exit-code check policy.
    pub fn check_policy(&self) -> CheckPolicy {
        self.check
    }

    /// Return a new descriptor with one more argument.
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.args.push(arg.into());
        next
    }

    /// Return a new descriptor with `extra` appended to the arguments.
    pub fn with_args<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.args.extend(extra.into_iter().map(Into::into));
        next
    }

    /// Return a new descriptor reading stdin from `target`.
    ///
    /// There is no append flag: an input is opened read-only, so truncate
    /// versus append never applies to it.
    pub fn with_input(&self, target: impl Into<Redirect>) -> Self {
        Self {
            input: Some(target.into()),
            ..self.clone()
        }
    }

    /// Return a new descriptor writing stdout to `target`.
    ///
    /// `append` only matters when the target is a path.
    pub fn with_output(&self, target: impl Into<Redirect>, append: bool) -> Self {
        Self {
            output: Some(target.into()),
            append,
            ..self.clone()
        }
    }

    /// Return a new descriptor with the given check policy.
    pub fn with_check(&self, policy: impl Into<CheckPolicy>) -> Self {
        Self {
            check: policy.into(),
            ..self.clone()
        }
    }

    /// Shorthand for `with_check(CheckPolicy::ExpectZero)`.
    pub fn checked(&self) -> Self {
        self.with_check(CheckPolicy::ExpectZero)
    }

    /// The program and arguments in shell-quoted form, without redirects.
    pub fn argv_display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| match shlex::try_quote(word) {
                Ok(quoted) => quoted.into_owned(),
                Err(_) => format!("{:?}", word),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv_display())?;
        if let Some(input) = &self.input {
            write!(f, " < {}", input)?;
        }
        if let Some(output) = &self.output {
            let op = if self.append { ">>" } else { ">" };
            write!(f, " {} {}", op, output)?;
        }
        Ok(())
    }
}
