//! YAML configuration parsing.
//!
//! Parses pipeline definitions from YAML files. A pipeline node is either
//! a shell string, an explicit command, or a `pipe`/`and`/`or` list:
//!
//! ```yaml
//! name: word-count
//! defaults:
//!   check: true
//! runner:
//!   mode: capture
//! pipeline:
//!   pipe:
//!     - program: cat
//!       args: [data.txt]
//!     - "sort -u"
//!     - "wc -l"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::command::CheckPolicy;
use crate::core::redirect::Redirect;

use super::error::ConfigError;

/// Keyword accepted wherever a redirect target is expected.
pub const DISCARD: &str = "discard";

/// Pipeline configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Environment variables for every stage.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Start stages with an empty environment.
    #[serde(default)]
    pub clear_env: bool,
    /// Working directory for every stage.
    pub working_dir: Option<String>,
    /// Defaults for explicit command nodes.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// How the pipeline is submitted.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// The composition itself.
    pub pipeline: NodeConfig,
}

/// Defaults applied to `program:` nodes that leave a field unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub check: Option<CheckConfig>,
}

/// Submission settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub mode: RunMode,
    /// Override for the last stage that actually runs.
    pub check: Option<CheckConfig>,
    pub stdin: Option<String>,
    pub stdout: Option<String>,
    #[serde(default)]
    pub append: bool,
}

/// Submission mode, matching the runner presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Wait and check.
    #[default]
    Run,
    /// Return without waiting.
    Background,
    /// Wait, check and collect stdout.
    Capture,
}

/// Exit-code check: `false`, `true` or an exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckConfig {
    Flag(bool),
    Code(i32),
}

impl From<CheckConfig> for CheckPolicy {
    fn from(config: CheckConfig) -> Self {
        match config {
            CheckConfig::Flag(flag) => CheckPolicy::from(flag),
            CheckConfig::Code(code) => CheckPolicy::ExpectCode(code),
        }
    }
}

/// A node of the composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeConfig {
    /// Shell text, split into argv.
    Shell(String),
    /// Stages joined by pipes.
    Pipe { pipe: Vec<NodeConfig> },
    /// Nodes joined by `&&`.
    And { and: Vec<NodeConfig> },
    /// Nodes joined by `||`.
    Or { or: Vec<NodeConfig> },
    /// An explicit command.
    Command(CommandConfig),
}

/// Explicit command node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub stdout: Option<String>,
    #[serde(default)]
    pub append: bool,
    pub check: Option<CheckConfig>,
}

/// Turn a redirect value into a target: a path, or the `discard` keyword.
pub fn parse_redirect(value: &str) -> Redirect {
    if value == DISCARD {
        Redirect::Discard
    } else {
        Redirect::path(value)
    }
}

/// Loader for YAML configuration files.
pub struct YamlLoader;

impl YamlLoader {
    /// Load a pipeline configuration from a file.
    pub fn load_pipeline_config(path: impl AsRef<Path>) -> Result<PipelineConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate_pipeline_config(&config)?;
        Ok(config)
    }

    /// Parse a pipeline configuration from a YAML string.
    pub fn parse_pipeline_config(yaml: &str) -> Result<PipelineConfig, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        Self::validate_pipeline_config(&config)?;
        Ok(config)
    }

    /// Validate a pipeline configuration.
    fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }
        if config.runner.mode == RunMode::Capture && config.runner.stdout.is_some() {
            return Err(ConfigError::InvalidConfig(
                "runner stdout cannot be redirected in capture mode".into(),
            ));
        }
        Self::validate_node(&config.pipeline)
    }

    fn validate_node(node: &NodeConfig) -> Result<(), ConfigError> {
        let (op, nodes) = match node {
            NodeConfig::Shell(text) if text.trim().is_empty() => {
                return Err(ConfigError::InvalidConfig("empty shell command".into()));
            }
            NodeConfig::Shell(_) => return Ok(()),
            NodeConfig::Command(command) if command.program.is_empty() => {
                return Err(ConfigError::MissingField("program".into()));
            }
            NodeConfig::Command(_) => return Ok(()),
            NodeConfig::Pipe { pipe } => ("pipe", pipe),
            NodeConfig::And { and } => ("and", and),
            NodeConfig::Or { or } => ("or", or),
        };

        if nodes.is_empty() {
            return Err(ConfigError::InvalidConfig(format!("`{op}` list is empty")));
        }
        nodes.iter().try_for_each(Self::validate_node)
    }
}
