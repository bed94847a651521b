//! pw - run declarative process pipelines.
//!
//! Usage:
//!   pw run <FILE>          Submit the pipeline described in a YAML file
//!   pw validate <PATH>     Validate a pipeline file or a directory of them
//!   pw show <FILE>         Print the pipeline in shell notation
//!   pw exec <STAGE>...     Combine shell-text stages ad hoc and run them

use clap::{Parser, Subcommand, ValueEnum};
use pipework::{
    BuildError, CheckPolicy, ExecError, Operand, ProcessHandle, RunMode, Runner, Tree, and_then,
    load_pipeline, load_pipelines_from_directory, or_else, pipe,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// pw - Compose and run external-process pipelines
#[derive(Parser)]
#[command(name = "pw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the pipeline described in a YAML file
    Run {
        /// Path to the pipeline YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Wait and print the final stage's stdout
        #[arg(long, conflicts_with = "background")]
        capture: bool,

        /// Start the pipeline and exit without waiting
        #[arg(long)]
        background: bool,

        #[command(flatten)]
        check: CheckArgs,
    },

    /// Validate a pipeline file, or every pipeline file in a directory
    Validate {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the composition tree in shell notation
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Combine shell-text stages with one operator and run them
    Exec {
        /// Operator joining the stages
        #[arg(long, value_enum, default_value = "pipe")]
        op: Operator,

        /// Print the final stage's stdout after it exits
        #[arg(long)]
        capture: bool,

        #[command(flatten)]
        check: CheckArgs,

        /// Stages, each a shell-quoted command line
        #[arg(value_name = "STAGE", required = true)]
        stages: Vec<String>,
    },
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Require this exit code from the last stage that runs
    #[arg(long, value_name = "CODE", conflicts_with = "no_check")]
    check: Option<i32>,

    /// Accept any exit code from the last stage that runs
    #[arg(long)]
    no_check: bool,
}

impl CheckArgs {
    fn policy(&self) -> Option<CheckPolicy> {
        if self.no_check {
            return Some(CheckPolicy::NoCheck);
        }
        self.check.map(CheckPolicy::ExpectCode)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Operator {
    Pipe,
    And,
    Or,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Logs go to stderr so captured output stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            capture,
            background,
            check,
        } => run_pipeline(file, capture, background, check.policy()).await,
        Commands::Validate { path } => {
            validate_pipelines(path)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { file } => {
            show_pipeline(file)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec {
            op,
            capture,
            check,
            stages,
        } => exec_stages(op, capture, check.policy(), stages).await,
    }
}

/// Submit a pipeline file and report the last stage's exit code.
async fn run_pipeline(
    file: PathBuf,
    capture: bool,
    background: bool,
    check: Option<CheckPolicy>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut pipeline = load_pipeline(&file)?;
    if capture {
        pipeline.mode = RunMode::Capture;
    } else if background {
        pipeline.mode = RunMode::Background;
    }
    if check.is_some() {
        pipeline.check = check;
    }

    info!("Running '{}': {}", pipeline.name, pipeline.tree);
    let result = pipeline.submit().await;
    report(result, pipeline.mode)
}

/// Validate pipeline configurations without running.
fn validate_pipelines(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating pipelines in: {}", path.display());

    let loaded = if path.is_dir() {
        load_pipelines_from_directory(&path)
    } else {
        load_pipeline(&path).map(|pipeline| vec![pipeline])
    };

    match loaded {
        Ok(pipelines) => {
            if pipelines.is_empty() {
                warn!("No pipeline files found in {}", path.display());
            }
            for pipeline in &pipelines {
                info!("  - {} ({} stage(s)): OK", pipeline.name, pipeline.tree.leaves().len());
            }
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Print a pipeline in shell notation.
fn show_pipeline(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(&file)?;

    println!("Name: {}", pipeline.name);
    if let Some(description) = &pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Mode: {:?}", pipeline.mode);
    if let Some(check) = pipeline.check {
        println!("  Check: {}", check);
    }
    println!("  Pipeline: {}", pipeline.tree);
    for command in pipeline.tree.leaves() {
        println!("    - {} (check: {})", command, command.check_policy());
    }

    Ok(())
}

/// Combine stages ad hoc and run them.
async fn exec_stages(
    op: Operator,
    capture: bool,
    check: Option<CheckPolicy>,
    stages: Vec<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let tree = combine(op, stages)?;

    let mut runner = Runner::run().with_capture(capture);
    if let Some(policy) = check {
        runner = runner.with_check(policy);
    }

    let mode = if capture { RunMode::Capture } else { RunMode::Run };
    report(runner.submit(&tree).await, mode)
}

fn combine(op: Operator, stages: Vec<String>) -> Result<Tree, BuildError> {
    let mut stages = stages.into_iter();
    let mut acc = Operand::Shell(stages.next().ok_or(BuildError::EmptyCommand)?);
    for stage in stages {
        let tree = match op {
            Operator::Pipe => pipe(acc, stage)?,
            Operator::And => and_then(acc, stage)?,
            Operator::Or => or_else(acc, stage)?,
        };
        acc = Operand::Tree(tree);
    }
    acc.into_tree(CheckPolicy::NoCheck)
}

/// Turn a submission result into the process exit status.
fn report(
    result: Result<ProcessHandle, ExecError>,
    mode: RunMode,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let handle = match result {
        Ok(handle) => handle,
        Err(e) if e.is_command_failure() => {
            error!("{}", e);
            return Ok(exit_status(e.exit_code().unwrap_or(1)));
        }
        Err(e) => return Err(e.into()),
    };

    match mode {
        RunMode::Background => {
            let pid = handle
                .id()
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "exited".into());
            info!("Started '{}' (pid: {})", handle.command(), pid);
            Ok(ExitCode::SUCCESS)
        }
        RunMode::Capture | RunMode::Run => {
            if mode == RunMode::Capture {
                std::io::stdout().write_all(handle.output())?;
            }
            let code = handle.exit_code().unwrap_or(0);
            info!("'{}' exited with code {}", handle.command(), code);
            Ok(exit_status(code))
        }
    }
}

fn exit_status(code: i32) -> ExitCode {
    // Signals are reported the way shells do.
    let code = if code < 0 { 128 - code } else { code };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
