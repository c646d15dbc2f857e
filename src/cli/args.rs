//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// passflow - ordered, phase-based execution of build passes.
#[derive(Debug, Parser)]
#[command(name = "passflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to manifest (overrides .passflow/config.yml)
    #[arg(short, long, global = true, env = "PASSFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show every unit as it runs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every unit (default if no command specified)
    Run(RunArgs),

    /// Show the execution order without running anything
    Plan(PlanArgs),

    /// Report unresolved references, contradictions and cycles
    Check(CheckArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Subject handed to every unit (overrides the manifest's)
    #[arg(short, long)]
    pub subject: Option<String>,

    /// Keep running after a unit fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Show the execution order without running anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Only show units whose id matches this regex
    #[arg(short, long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Print findings as JSON
    #[arg(long)]
    pub json: bool,
}
