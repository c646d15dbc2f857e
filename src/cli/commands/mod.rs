//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`].

pub mod check;
pub mod dispatcher;
pub mod plan;
pub mod run;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, ManifestSource, EXIT_NO_CONFIG};
