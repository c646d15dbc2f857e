//! Command-line interface for passflow.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{CheckArgs, Cli, Commands, PlanArgs, RunArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
