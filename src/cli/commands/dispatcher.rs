//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::Manifest;
use crate::error::{PassflowError, Result};
use crate::ui::UserInterface;

/// Exit code when no manifest was found.
pub const EXIT_NO_CONFIG: i32 = 2;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Where a command finds its manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub project_root: PathBuf,
    pub config: Option<PathBuf>,
}

impl ManifestSource {
    /// Load and validate the manifest.
    ///
    /// `Ok(None)` when there is none; the error has been shown.
    pub fn load(&self, ui: &mut dyn UserInterface) -> Result<Option<Manifest>> {
        match Manifest::load(&self.project_root, self.config.as_deref()) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(PassflowError::ConfigNotFound { path }) => {
                ui.error(&format!("No manifest found at {}", path.display()));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    source: ManifestSource,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf, config: Option<PathBuf>) -> Self {
        Self {
            source: ManifestSource {
                project_root,
                config,
            },
        }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.source.project_root
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let source = self.source.clone();
        match &cli.command {
            Some(Commands::Run(args)) => super::run::RunCommand::new(source, args.clone()).execute(ui),
            Some(Commands::Plan(args)) => {
                super::plan::PlanCommand::new(source, args.clone()).execute(ui)
            }
            Some(Commands::Check(args)) => {
                super::check::CheckCommand::new(source, args.clone()).execute(ui)
            }
            None => super::run::RunCommand::new(source, RunArgs::default()).execute(ui),
        }
    }
}
