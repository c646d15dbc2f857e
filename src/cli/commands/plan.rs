//! Plan command implementation.
//!
//! `passflow plan` shows the execution order of every phase.

use regex::Regex;

use crate::cli::args::PlanArgs;
use crate::error::{PassflowError, Result};
use crate::runner::{Pipeline, Schedule, Severity};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, ManifestSource, EXIT_NO_CONFIG};

/// The plan command implementation.
pub struct PlanCommand {
    source: ManifestSource,
    args: PlanArgs,
}

impl PlanCommand {
    pub fn new(source: ManifestSource, args: PlanArgs) -> Self {
        Self { source, args }
    }
}

/// Print a schedule phase by phase, with its diagnostics.
pub(super) fn render_schedule(ui: &mut dyn UserInterface, schedule: &Schedule) {
    let mut index = 0;
    for plan in &schedule.phases {
        ui.show_phase(plan.phase.as_str(), plan.order.len());
        for id in &plan.order {
            index += 1;
            ui.message(&format!("  {:>3}. {}", index, id));
        }
    }

    for diagnostic in schedule.diagnostics() {
        match diagnostic.severity {
            Severity::Error => ui.error(&diagnostic.message),
            Severity::Warning => ui.warning(&diagnostic.message),
            Severity::Info => {}
        }
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let filter = match self.args.filter.as_deref().map(Regex::new).transpose() {
            Ok(filter) => filter,
            Err(e) => {
                ui.error(&format!("Invalid filter: {}", e));
                return Ok(CommandResult::failure(1));
            }
        };

        let Some(manifest) = self.source.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_NO_CONFIG));
        };

        // A filtered view hides most units; warnings about them are noise.
        let suppress = filter.is_some() || manifest.config().settings.suppress_warnings;
        let pipeline = Pipeline::new(manifest).suppress_warnings(suppress);

        let schedule = match pipeline.plan() {
            Ok(schedule) => schedule,
            Err(e @ PassflowError::CircularDependency { .. }) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        let schedule = match &filter {
            Some(pattern) => schedule.filter(pattern),
            None => schedule,
        };

        if self.args.json {
            let json = serde_json::to_string_pretty(&schedule)
                .map_err(|e| PassflowError::Other(e.into()))?;
            ui.message(&json);
            return Ok(CommandResult::success());
        }

        if schedule.is_empty() {
            ui.message("Nothing to run");
        } else {
            render_schedule(ui, &schedule);
        }

        Ok(CommandResult::success())
    }
}
