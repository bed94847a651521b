//! Configuration loading and parsing.
//!
//! This module provides YAML-based pipeline definitions.

mod builder;
mod error;
mod yaml;

pub use builder::{Pipeline, PipelineBuilder, load_pipeline, load_pipelines_from_directory};
pub use error::ConfigError;
pub use yaml::{
    CheckConfig, CommandConfig, DISCARD, DefaultsConfig, NodeConfig, PipelineConfig, RunMode,
    RunnerConfig, YamlLoader, parse_redirect,
};
