//! Run command implementation.
//!
//! `passflow run` executes every unit of the manifest, phase by phase.

use crate::cli::args::RunArgs;
use crate::error::{PassflowError, Result};
use crate::runner::{FailurePolicy, Pipeline, RunProgress, Severity};
use crate::ui::{format_duration, UserInterface};
use crate::unit::ExecutionContext;

use super::dispatcher::{Command, CommandResult, ManifestSource, EXIT_NO_CONFIG};
use super::plan::render_schedule;

/// The run command implementation.
pub struct RunCommand {
    source: ManifestSource,
    args: RunArgs,
}

impl RunCommand {
    pub fn new(source: ManifestSource, args: RunArgs) -> Self {
        Self { source, args }
    }

    pub fn args(&self) -> &RunArgs {
        &self.args
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(manifest) = self.source.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_NO_CONFIG));
        };

        let settings = &manifest.config().settings;
        let policy = if self.args.continue_on_error {
            FailurePolicy::ContinueOnError
        } else {
            settings.failure_policy
        };
        let suppress = settings.suppress_warnings;
        let subject = self
            .args
            .subject
            .clone()
            .unwrap_or_else(|| manifest.subject().to_string());

        let pipeline = Pipeline::new(manifest)
            .failure_policy(policy)
            .suppress_warnings(suppress);

        if self.args.dry_run {
            ui.show_header("Dry run");
            return match pipeline.plan() {
                Ok(schedule) => {
                    render_schedule(ui, &schedule);
                    Ok(CommandResult::success())
                }
                Err(e @ PassflowError::CircularDependency { .. }) => {
                    ui.error(&e.to_string());
                    Ok(CommandResult::failure(1))
                }
                Err(e) => Err(e),
            };
        }

        let mut ctx = ExecutionContext::new(subject);
        let outcome = pipeline.run_with_progress(&mut ctx, |event| match event {
            RunProgress::PhaseStarted { phase, units } => ui.show_phase(phase.as_str(), units),
            RunProgress::UnitStarting {
                id, index, total, ..
            } => ui.show_unit(index + 1, total, id),
            RunProgress::UnitFailed { id, error } => {
                ui.error(&format!("{} failed: {:#}", id, error))
            }
            RunProgress::UnitFinished { .. } | RunProgress::PhaseFinished { .. } => {}
        });

        let report = match outcome {
            Ok(report) => report,
            Err(e @ PassflowError::UnitExecutionFailure { .. })
            | Err(e @ PassflowError::CircularDependency { .. }) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        for diagnostic in &report.diagnostics {
            if diagnostic.severity == Severity::Warning {
                ui.warning(&diagnostic.message);
            }
        }

        if report.success {
            ui.success(&format!(
                "{} units ran in {}",
                report.executed.len(),
                format_duration(report.duration)
            ));
            Ok(CommandResult::success())
        } else {
            ui.error(&format!(
                "{} of {} units failed",
                report.failures.len(),
                report.failures.len() + report.executed.len()
            ));
            Ok(CommandResult::failure(1))
        }
    }
}
