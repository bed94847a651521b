//! Pipeline builder from YAML configuration.
//!
//! This module converts a [`PipelineConfig`] into a composition tree plus
//! the runner settings it was declared with. Lists fold left through the
//! same combinators the library exposes, so shell strings pick up their
//! check policy from the explicit node beside them.

use std::path::{Path, PathBuf};

use crate::core::command::{CheckPolicy, Command};
use crate::core::error::BuildError;
use crate::core::operand::Operand;
use crate::core::options::ProcessOptions;
use crate::core::redirect::Redirect;
use crate::core::tree::{self, Tree};
use crate::execution::{ExecError, ProcessHandle, Runner};

use super::error::ConfigError;
use super::yaml::{CommandConfig, NodeConfig, PipelineConfig, RunMode, YamlLoader, parse_redirect};

type Combinator = fn(Operand, Operand) -> Result<Tree, BuildError>;

/// A pipeline ready to submit.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub description: Option<String>,
    pub tree: Tree,
    pub options: ProcessOptions,
    pub mode: RunMode,
    /// Override for the last stage that actually runs.
    pub check: Option<CheckPolicy>,
    pub stdin: Option<Redirect>,
    pub stdout: Option<(Redirect, bool)>,
}

impl Pipeline {
    /// The runner matching the declared mode and overrides.
    ///
    /// Capture mode drains stdout into [`ProcessHandle::output`].
    pub fn runner(&self) -> Runner<ProcessHandle> {
        let mut runner = match self.mode {
            RunMode::Run => Runner::run(),
            RunMode::Background => Runner::background(),
            RunMode::Capture => Runner::run().with_capture(true),
        }
        .with_options(self.options.clone());

        if let Some(policy) = self.check {
            runner = runner.with_check(policy);
        }
        if let Some(target) = &self.stdin {
            runner = runner.with_stdin(target.clone());
        }
        if let Some((target, append)) = &self.stdout {
            runner = runner.with_stdout(target.clone(), *append);
        }
        runner
    }

    /// Submit the tree with [`runner`](Self::runner).
    pub async fn submit(&self) -> Result<ProcessHandle, ExecError> {
        self.runner().submit(&self.tree).await
    }
}

/// Builder for creating Pipelines from YAML configuration.
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Build a Pipeline from a PipelineConfig.
    pub fn build(config: PipelineConfig) -> Result<Pipeline, ConfigError> {
        let default_check = config.defaults.check.map(CheckPolicy::from);
        // A lone shell string has no neighbour to borrow a policy from.
        let tree = Self::build_node(&config.pipeline, default_check)?.into_tree(CheckPolicy::NoCheck)?;

        let mut options = ProcessOptions::new()
            .environment(config.environment.into_iter().collect())
            .clear_env(config.clear_env);
        if let Some(dir) = config.working_dir {
            options = options.working_dir(dir);
        }

        let runner = config.runner;
        let stdout = runner
            .stdout
            .as_deref()
            .map(|value| (parse_redirect(value), runner.append));

        Ok(Pipeline {
            name: config.name,
            description: config.description,
            tree,
            options,
            mode: runner.mode,
            check: runner.check.map(CheckPolicy::from),
            stdin: runner.stdin.as_deref().map(parse_redirect),
            stdout,
        })
    }

    fn build_node(node: &NodeConfig, default_check: Option<CheckPolicy>) -> Result<Operand, ConfigError> {
        match node {
            NodeConfig::Shell(text) => Ok(Operand::Shell(text.clone())),
            NodeConfig::Command(command) => {
                let command = Self::build_command(command, default_check)?;
                Ok(Operand::Tree(command.into()))
            }
            NodeConfig::Pipe { pipe } => Self::fold("pipe", pipe, default_check, |l, r| tree::pipe(l, r)),
            NodeConfig::And { and } => Self::fold("and", and, default_check, |l, r| tree::and_then(l, r)),
            NodeConfig::Or { or } => Self::fold("or", or, default_check, |l, r| tree::or_else(l, r)),
        }
    }

    fn fold(
        op: &str,
        nodes: &[NodeConfig],
        default_check: Option<CheckPolicy>,
        combine: Combinator,
    ) -> Result<Operand, ConfigError> {
        let mut nodes = nodes.iter();
        let first = nodes
            .next()
            .ok_or_else(|| ConfigError::InvalidConfig(format!("`{op}` list is empty")))?;

        let mut acc = Self::build_node(first, default_check)?;
        for node in nodes {
            let next = Self::build_node(node, default_check)?;
            acc = Operand::Tree(combine(acc, next)?);
        }
        Ok(acc)
    }

    fn build_command(config: &CommandConfig, default_check: Option<CheckPolicy>) -> Result<Command, ConfigError> {
        let argv = std::iter::once(config.program.as_str()).chain(config.args.iter().map(String::as_str));
        let mut command = Command::from_argv(argv)?;

        if let Some(stdin) = &config.stdin {
            command = command.with_input(parse_redirect(stdin));
        }
        if let Some(stdout) = &config.stdout {
            command = command.with_output(parse_redirect(stdout), config.append);
        }
        if let Some(policy) = config.check.map(CheckPolicy::from).or(default_check) {
            command = command.with_check(policy);
        }
        Ok(command)
    }
}

/// Load and build a single pipeline file.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline, ConfigError> {
    let config = YamlLoader::load_pipeline_config(path)?;
    PipelineBuilder::build(config)
}

/// Load all pipeline files (`.yaml`/`.yml`) in a directory, sorted by path.
pub fn load_pipelines_from_directory(dir: impl AsRef<Path>) -> Result<Vec<Pipeline>, ConfigError> {
    let dir = dir.as_ref();

    if !dir.is_dir() {
        return Err(ConfigError::InvalidConfig(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let dir_error = |source: std::io::Error| ConfigError::DirReadError {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if let Some(ext) = path.extension()
            && (ext == "yaml" || ext == "yml")
        {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(load_pipeline).collect()
}
