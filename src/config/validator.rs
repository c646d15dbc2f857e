//! Manifest validation rules.
//!
//! Checks the manifest for problems that would otherwise only surface
//! once the registry instantiates units:
//! - Unit and job ids must be non-empty
//! - Step names must be non-empty and must not contain `.`
//! - Unit ids and expanded step ids must be unique
//! - No target may appear on both sides of a constraint
//! - Reference lists must not contain empty strings
//!
//! Unknown targets are not errors here. They are reported as diagnostics
//! when the schedule is built.

use crate::config::schema::PassflowConfig;
use crate::error::{PassflowError, Result};
use crate::job::STEP_SEPARATOR;
use serde::Serialize;
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Unit, job or step id the error belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ValidationError {
    fn new(rule: &str, unit: Option<&str>, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            unit: unit.map(str::to_string),
        }
    }
}

/// Validate a manifest and return all errors.
pub fn validate_config(config: &PassflowConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_ids(config));
    errors.extend(validate_constraints(config));

    errors
}

fn validate_ids(config: &PassflowConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut jobs = HashSet::new();

    for unit in &config.units {
        if unit.id.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-id",
                None,
                "A unit has an empty id".to_string(),
            ));
        } else if !seen.insert(unit.id.clone()) {
            errors.push(ValidationError::new(
                "duplicate-id",
                Some(&unit.id),
                format!("Unit id '{}' is used more than once", unit.id),
            ));
        }
    }

    for job in &config.jobs {
        if job.id.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-id",
                None,
                "A job has an empty id".to_string(),
            ));
            continue;
        }
        if !jobs.insert(job.id.as_str()) {
            errors.push(ValidationError::new(
                "duplicate-job",
                Some(&job.id),
                format!("Job id '{}' is used more than once", job.id),
            ));
            continue;
        }

        for step in &job.steps {
            if step.name.is_empty() || step.name.contains(STEP_SEPARATOR) {
                errors.push(ValidationError::new(
                    "invalid-step-name",
                    Some(&job.id),
                    format!(
                        "Job '{}' has a step named '{}'; step names must be non-empty and contain no '{}'",
                        job.id, step.name, STEP_SEPARATOR
                    ),
                ));
                continue;
            }
            let id = format!("{}{}{}", job.id, STEP_SEPARATOR, step.name);
            if !seen.insert(id.clone()) {
                errors.push(ValidationError::new(
                    "duplicate-id",
                    Some(&id),
                    format!("Step id '{}' is used more than once", id),
                ));
            }
        }
    }

    errors
}

/// Report targets listed on both sides, and empty targets.
fn check_pair(
    owner: &str,
    after: &[String],
    before: &[String],
    kind: &str,
    errors: &mut Vec<ValidationError>,
) {
    if after.iter().chain(before).any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::new(
            "empty-reference",
            Some(owner),
            format!("'{}' lists an empty {} reference", owner, kind),
        ));
    }

    for target in after.iter().filter(|t| before.contains(t)) {
        errors.push(ValidationError::new(
            "contradictory-constraint",
            Some(owner),
            format!(
                "'{}' is declared to run both after and before {} '{}'",
                owner, kind, target
            ),
        ));
    }
}

fn validate_constraints(config: &PassflowConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for unit in &config.units {
        check_pair(&unit.id, &unit.after, &unit.before, "unit", &mut errors);
        check_pair(&unit.id, &unit.after_jobs, &unit.before_jobs, "job", &mut errors);
    }

    for job in &config.jobs {
        for step in &job.steps {
            let id = format!("{}{}{}", job.id, STEP_SEPARATOR, step.name);
            check_pair(&id, &step.after_steps, &step.before_steps, "step", &mut errors);
            check_pair(&id, &step.after_jobs, &step.before_jobs, "job", &mut errors);
        }
    }

    errors
}

/// Validate a manifest, failing with every error at once.
///
/// # Errors
///
/// `ConfigValidationError` with every message joined by `; `.
pub fn validate(config: &PassflowConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(PassflowError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> PassflowConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn rules(config: &PassflowConfig) -> Vec<String> {
        validate_config(config).into_iter().map(|e| e.rule).collect()
    }

    #[test]
    fn valid_manifest_passes() {
        let config = parse(
            r#"
units:
  - id: setup
    phase: setup
  - id: compile
    after: [setup]
    before_jobs: [assets]
jobs:
  - id: assets
    steps:
      - name: generate
      - name: pack
        after_steps: [assets.generate]
"#,
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_empty_unit_id() {
        let config = parse("units:\n  - id: ''\n");
        assert_eq!(rules(&config), vec!["empty-id"]);
    }

    #[test]
    fn rejects_duplicate_unit_ids() {
        let config = parse("units:\n  - id: a\n  - id: a\n");
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "duplicate-id");
        assert_eq!(errors[0].unit.as_deref(), Some("a"));
    }

    #[test]
    fn step_id_clashing_with_unit_id_is_a_duplicate() {
        let config = parse(
            "units:\n  - id: assets.pack\njobs:\n  - id: assets\n    steps:\n      - name: pack\n",
        );
        assert_eq!(rules(&config), vec!["duplicate-id"]);
    }

    #[test]
    fn rejects_duplicate_jobs() {
        let config = parse("jobs:\n  - id: j\n  - id: j\n");
        assert_eq!(rules(&config), vec!["duplicate-job"]);
    }

    #[test]
    fn rejects_step_names_with_separator() {
        let config = parse("jobs:\n  - id: j\n    steps:\n      - name: a.b\n      - name: ''\n");
        assert_eq!(rules(&config), vec!["invalid-step-name", "invalid-step-name"]);
    }

    #[test]
    fn rejects_contradictory_unit_constraint() {
        let config = parse("units:\n  - id: x\n    after: [y]\n    before: [y]\n");
        assert_eq!(rules(&config), vec!["contradictory-constraint"]);
    }

    #[test]
    fn rejects_contradictory_job_constraint_on_step() {
        let config = parse(
            "jobs:\n  - id: j\n    steps:\n      - name: s\n        after_jobs: [k]\n        before_jobs: [k]\n",
        );
        let errors = validate_config(&config);
        assert_eq!(errors[0].rule, "contradictory-constraint");
        assert_eq!(errors[0].unit.as_deref(), Some("j.s"));
    }

    #[test]
    fn same_name_as_unit_and_job_is_not_contradictory() {
        let config = parse("units:\n  - id: x\n    after: [j]\n    before_jobs: [j]\n");
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn rejects_empty_reference() {
        let config = parse("units:\n  - id: x\n    after: ['']\n");
        assert_eq!(rules(&config), vec!["empty-reference"]);
    }

    #[test]
    fn unknown_targets_are_not_validation_errors() {
        let config = parse("units:\n  - id: x\n    after: [nowhere]\n");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn validate_joins_messages() {
        let config = parse("units:\n  - id: a\n  - id: a\n  - id: ''\n");
        match validate(&config) {
            Err(PassflowError::ConfigValidationError { message }) => {
                assert!(message.contains("; "));
                assert!(message.contains("'a'"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
