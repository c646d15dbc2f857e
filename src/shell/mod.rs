//! Shell command execution and command-backed units.

pub mod command;
pub mod unit;

pub use command::{execute, CommandOptions, CommandResult};
pub use unit::{run_command, CommandUnit};
