//! Per-submission process options.
//!
//! Every stage spawned by one submission shares the same environment
//! variables and working directory. These are the only spawn parameters
//! passed through to the operating system besides argv and the standard
//! streams.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variables set on each spawned process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Create a new environment with `other`'s variables layered on top.
    pub fn merged_with(&self, other: &Environment) -> Self {
        let mut vars = self.vars.clone();
        vars.extend(other.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { vars }
    }

    /// Iterate over the variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Spawn parameters shared by every stage of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    environment: Environment,
    clear_env: bool,
    working_dir: Option<PathBuf>,
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `env` over the variables already set. Later values win.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = self.environment.merged_with(&env);
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment = self.environment.with_var(key, value);
        self
    }

    /// Start children with an empty environment instead of inheriting ours.
    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn vars(&self) -> &Environment {
        &self.environment
    }

    pub fn clears_env(&self) -> bool {
        self.clear_env
    }

    pub fn dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}
