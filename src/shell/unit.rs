//! Units backed by shell commands.

use tracing::debug;

use super::command::{execute, CommandOptions};
use crate::error::{PassflowError, Result};
use crate::unit::{Dependencies, ExecutionContext, Phase, TypeKey, WorkUnit};

/// Run `command` on behalf of unit `id`.
///
/// The command sees `PASSFLOW_SUBJECT`, `PASSFLOW_UNIT`, `PASSFLOW_PHASE`
/// and `PASSFLOW_RUN_ID` on top of `options.env`.
///
/// # Errors
///
/// `CommandFailed` when the shell cannot start or the command exits
/// non-zero.
pub fn run_command(
    command: &str,
    options: &CommandOptions,
    ctx: &ExecutionContext,
    id: &str,
    phase: Phase,
) -> Result<()> {
    let mut options = options.clone();
    options
        .env
        .insert("PASSFLOW_SUBJECT".to_string(), ctx.subject().to_string());
    options
        .env
        .insert("PASSFLOW_UNIT".to_string(), id.to_string());
    options
        .env
        .insert("PASSFLOW_PHASE".to_string(), phase.to_string());
    options
        .env
        .insert("PASSFLOW_RUN_ID".to_string(), ctx.run_id().to_string());

    debug!("Unit '{}' running: {}", id, command);
    let result = execute(command, &options)?;
    if !result.success {
        return Err(PassflowError::CommandFailed {
            command: command.to_string(),
            code: result.exit_code,
        });
    }
    Ok(())
}

/// A unit that runs a shell command.
///
/// A unit without a command does nothing when executed, which is useful as
/// an ordering anchor.
#[derive(Debug, Clone)]
pub struct CommandUnit {
    id: String,
    phase: Phase,
    command: Option<String>,
    dependencies: Dependencies,
    options: CommandOptions,
}

impl CommandUnit {
    /// Create a unit running `command` in the default phase.
    pub fn new(id: impl Into<String>, command: Option<String>) -> Self {
        Self {
            id: id.into(),
            phase: Phase::default(),
            command,
            dependencies: Dependencies::none(),
            options: CommandOptions::default(),
        }
    }

    /// Set the phase.
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the declarations.
    pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Set the command options.
    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }

    /// The command, if any.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

impl WorkUnit for CommandUnit {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn dependencies(&self) -> Result<Dependencies> {
        Ok(self.dependencies.clone())
    }

    fn type_key(&self) -> Option<TypeKey> {
        None
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> anyhow::Result<()> {
        match &self.command {
            Some(command) => Ok(run_command(command, &self.options, ctx, &self.id, self.phase)?),
            None => Ok(()),
        }
    }
}
