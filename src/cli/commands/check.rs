//! Check command implementation.
//!
//! `passflow check` reports everything that would make a run misbehave:
//! manifest rule violations, unresolved references and cycles.

use serde::Serialize;

use crate::cli::args::CheckArgs;
use crate::config::{load_config, validate_config, Manifest, ValidationError};
use crate::error::{PassflowError, Result};
use crate::runner::{Diagnostic, Pipeline, Severity};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, ManifestSource, EXIT_NO_CONFIG};

/// The check command implementation.
pub struct CheckCommand {
    source: ManifestSource,
    args: CheckArgs,
}

#[derive(Debug, Default, Serialize)]
struct CheckReport {
    validation: Vec<ValidationError>,
    diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    fn has_errors(&self) -> bool {
        !self.validation.is_empty() || self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl CheckCommand {
    pub fn new(source: ManifestSource, args: CheckArgs) -> Self {
        Self { source, args }
    }

    fn report(&self) -> Result<CheckReport> {
        let config = load_config(&self.source.project_root, self.source.config.as_deref())?;

        let validation = validate_config(&config);
        if !validation.is_empty() {
            // Invalid declarations cannot be scheduled.
            return Ok(CheckReport {
                validation,
                ..Default::default()
            });
        }

        let manifest = Manifest::new(config, &self.source.project_root);
        let diagnostics = Pipeline::new(manifest).check()?;
        Ok(CheckReport {
            validation,
            diagnostics,
        })
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let report = match self.report() {
            Ok(report) => report,
            Err(PassflowError::ConfigNotFound { path }) => {
                ui.error(&format!("No manifest found at {}", path.display()));
                return Ok(CommandResult::failure(EXIT_NO_CONFIG));
            }
            Err(e) => return Err(e),
        };

        if self.args.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| PassflowError::Other(e.into()))?;
            ui.message(&json);
        } else {
            for error in &report.validation {
                ui.error(&format!("[{}] {}", error.rule, error.message));
            }
            for diagnostic in &report.diagnostics {
                match diagnostic.severity {
                    Severity::Error => ui.error(&diagnostic.message),
                    Severity::Warning => ui.warning(&diagnostic.message),
                    Severity::Info => ui.message(&diagnostic.message),
                }
            }
            if !report.has_errors() {
                ui.success("No problems found");
            }
        }

        if report.has_errors() {
            Ok(CommandResult::failure(1))
        } else {
            Ok(CommandResult::success())
        }
    }
}
