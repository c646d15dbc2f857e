//! Jobs: named bundles of steps.
//!
//! A [`Job`] configures its steps through a [`JobBuilder`]. Each step is an
//! ordinary unit with the id `"<job id>.<step name>"`, so the scheduler
//! never sees jobs at all. Job-level references (`run_after_job`) are
//! sugar, expanded into step references by [`expand_job_dependencies`]
//! before partitioning.
//!
//! # Example
//!
//! ```
//! use passflow::job::{Job, JobBuilder};
//! use passflow::unit::{Phase, WorkUnit};
//! use passflow::Result;
//!
//! struct Lighting;
//!
//! impl Job for Lighting {
//!     fn job_id(&self) -> String {
//!         "lighting".to_string()
//!     }
//!
//!     fn configure(&self, job: &mut JobBuilder) -> Result<()> {
//!         job.add_step(Phase::Build, "bake")
//!             .execute(|ctx| ctx.set("baked", true));
//!         job.add_step(Phase::Optimize, "compress")
//!             .run_after_step("lighting.bake")
//!             .execute(|ctx| {
//!                 anyhow::ensure!(ctx.get_as::<bool>("baked")?.unwrap_or(false));
//!                 Ok(())
//!             });
//!         Ok(())
//!     }
//! }
//!
//! let steps = passflow::job::instantiate(&Lighting).unwrap();
//! assert_eq!(steps[1].id(), "lighting.compress");
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{PassflowError, Result};
use crate::runner::{Diagnostic, ScheduledUnit};
use crate::unit::{
    Dependencies, DependencyBuilder, DependencyReference, Direction, ExecutionContext, Phase,
    TypeKey, WorkUnit,
};

/// Separator between a job id and a step name.
pub const STEP_SEPARATOR: char = '.';

/// A named bundle of steps.
pub trait Job: 'static {
    /// Id of the job; prefix of all its step ids.
    fn job_id(&self) -> String;

    /// Declare the job's steps.
    fn configure(&self, job: &mut JobBuilder) -> Result<()>;
}

type StepAction = Box<dyn Fn(&mut ExecutionContext) -> anyhow::Result<()>>;

/// Collects the steps of one job.
#[derive(Debug)]
pub struct JobBuilder {
    job_id: String,
    steps: Vec<StepBuilder>,
}

impl JobBuilder {
    /// Create a builder for `job_id`.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            steps: Vec::new(),
        }
    }

    /// Id of the job being built.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Add a step named `name` in `phase`.
    pub fn add_step(&mut self, phase: Phase, name: impl Into<String>) -> &mut StepBuilder {
        let name = name.into();
        let step = StepBuilder {
            id: format!("{}{}{}", self.job_id, STEP_SEPARATOR, name),
            name,
            phase,
            dependencies: DependencyBuilder::new(),
            action: None,
        };
        self.steps.push(step);
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }

    /// Validate and build the steps, in the order they were added.
    ///
    /// # Errors
    ///
    /// `InvalidDeclaration` for an empty job id or a step name that is
    /// empty or contains the separator, plus any declaration error.
    pub fn build(self) -> Result<Vec<Step>> {
        if self.job_id.trim().is_empty() {
            return Err(PassflowError::InvalidDeclaration {
                message: "job id cannot be empty".to_string(),
            });
        }
        self.steps.into_iter().map(StepBuilder::build).collect()
    }
}

/// Declarations and body of one step.
pub struct StepBuilder {
    id: String,
    name: String,
    phase: Phase,
    dependencies: DependencyBuilder,
    action: Option<StepAction>,
}

impl StepBuilder {
    fn declare(&mut self, f: impl FnOnce(DependencyBuilder) -> DependencyBuilder) -> &mut Self {
        self.dependencies = f(std::mem::take(&mut self.dependencies));
        self
    }

    /// Full id of the step.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run after the step (or unit) with id `step_id`.
    pub fn run_after_step(&mut self, step_id: impl Into<String>) -> &mut Self {
        self.declare(|deps| deps.after_name(step_id))
    }

    /// Run before the step (or unit) with id `step_id`.
    pub fn run_before_step(&mut self, step_id: impl Into<String>) -> &mut Self {
        self.declare(|deps| deps.before_name(step_id))
    }

    /// Run after every step of `job_id`.
    pub fn run_after_job(&mut self, job_id: impl Into<String>) -> &mut Self {
        self.declare(|deps| deps.after_job(job_id))
    }

    /// Run before every step of `job_id`.
    pub fn run_before_job(&mut self, job_id: impl Into<String>) -> &mut Self {
        self.declare(|deps| deps.before_job(job_id))
    }

    /// Run after units of type `T`.
    pub fn run_after<T: WorkUnit>(&mut self) -> &mut Self {
        self.declare(|deps| deps.after::<T>())
    }

    /// Run before units of type `T`.
    pub fn run_before<T: WorkUnit>(&mut self) -> &mut Self {
        self.declare(|deps| deps.before::<T>())
    }

    /// Set the step body. Steps without one do nothing.
    pub fn execute(
        &mut self,
        action: impl Fn(&mut ExecutionContext) -> anyhow::Result<()> + 'static,
    ) -> &mut Self {
        self.action = Some(Box::new(action));
        self
    }

    fn build(self) -> Result<Step> {
        if self.name.trim().is_empty() {
            return Err(PassflowError::InvalidDeclaration {
                message: format!("step '{}' has an empty name", self.id),
            });
        }
        if self.name.contains(STEP_SEPARATOR) {
            return Err(PassflowError::InvalidDeclaration {
                message: format!(
                    "step name '{}' cannot contain '{}'",
                    self.name, STEP_SEPARATOR
                ),
            });
        }

        Ok(Step {
            id: self.id,
            phase: self.phase,
            dependencies: self.dependencies.build()?,
            action: self.action,
        })
    }
}

impl fmt::Debug for StepBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepBuilder")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// One step of a job, scheduled like any other unit.
pub struct Step {
    id: String,
    phase: Phase,
    dependencies: Dependencies,
    action: Option<StepAction>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl WorkUnit for Step {
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
        match &self.action {
            Some(action) => action(ctx),
            None => Ok(()),
        }
    }
}

/// Configure `job` and build its steps.
pub fn instantiate(job: &dyn Job) -> Result<Vec<Step>> {
    let mut builder = JobBuilder::new(job.job_id());
    job.configure(&mut builder)?;
    builder.build()
}

/// The job a step id belongs to: everything before the last separator.
pub fn job_of(step_id: &str) -> Option<&str> {
    step_id
        .rsplit_once(STEP_SEPARATOR)
        .map(|(job, _)| job)
        .filter(|job| !job.is_empty())
}

/// Rewrite job references into step references.
///
/// Every unit id is mapped back to its job; each `JobReference` on any
/// unit then gains one name reference per step of that job, in the same
/// direction. A unit is left out of its own job's expansion. References
/// to jobs without steps expand to nothing and are returned as info
/// diagnostics.
pub fn expand_job_dependencies(units: &mut [ScheduledUnit]) -> Vec<Diagnostic> {
    let mut steps_by_job: HashMap<String, Vec<String>> = HashMap::new();
    for unit in units.iter() {
        if let Some(job) = job_of(unit.id()) {
            steps_by_job
                .entry(job.to_string())
                .or_default()
                .push(unit.id().to_string());
        }
    }

    let mut diagnostics = Vec::new();

    for unit in units.iter_mut() {
        let references = unit.dependencies().jobs().to_vec();
        for reference in references {
            let Some(steps) = steps_by_job.get(&reference.job_id) else {
                debug!(
                    "Unit '{}' references job '{}' which has no steps",
                    unit.id(),
                    reference.job_id
                );
                diagnostics.push(Diagnostic::unknown_job(
                    unit.id(),
                    &reference.job_id,
                    reference.direction,
                ));
                continue;
            };

            let own_id = unit.id().to_string();
            for step in steps.iter().filter(|step| **step != own_id) {
                let expanded = match reference.direction {
                    Direction::After => DependencyReference::after_name(step.clone()),
                    Direction::Before => DependencyReference::before_name(step.clone()),
                };
                unit.dependencies_mut().push_unit(expanded);
            }
        }
    }

    diagnostics
}
