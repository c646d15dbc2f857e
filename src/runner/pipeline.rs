//! Pipeline execution orchestration.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::graph::{Diagnostic, NameTable};
use super::partition::{self, partition, plan_phase, Schedule};
use super::scheduled::{ensure_unique_ids, ScheduledUnit};
use crate::error::{PassflowError, Result};
use crate::job::expand_job_dependencies;
use crate::registry::Discovery;
use crate::unit::{ExecutionContext, Phase};

/// Where a pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Discovering,
    Expanding,
    Partitioning,
    Sorting(Phase),
    Executing(Phase),
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Discovering => f.write_str("discovering"),
            PipelineState::Expanding => f.write_str("expanding"),
            PipelineState::Partitioning => f.write_str("partitioning"),
            PipelineState::Sorting(phase) => write!(f, "sorting {}", phase),
            PipelineState::Executing(phase) => write!(f, "executing {}", phase),
            PipelineState::Completed => f.write_str("completed"),
            PipelineState::Failed => f.write_str("failed"),
        }
    }
}

/// What happens when a unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing unit. Later units and phases are skipped.
    #[default]
    #[serde(alias = "abort")]
    AbortPipeline,
    /// Record the failure and keep going.
    #[serde(alias = "continue")]
    ContinueOnError,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortPipeline => f.write_str("abort"),
            FailurePolicy::ContinueOnError => f.write_str("continue"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "abort" | "abort_pipeline" => Ok(FailurePolicy::AbortPipeline),
            "continue" | "continue_on_error" => Ok(FailurePolicy::ContinueOnError),
            _ => Err(format!("unknown failure policy: {}", s)),
        }
    }
}

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A phase is about to execute.
    PhaseStarted { phase: Phase, units: usize },
    /// A unit is about to run.
    UnitStarting {
        id: &'a str,
        phase: Phase,
        index: usize,
        total: usize,
    },
    /// A unit returned successfully.
    UnitFinished { id: &'a str, duration: Duration },
    /// A unit returned an error.
    UnitFailed { id: &'a str, error: &'a anyhow::Error },
    /// Every unit of a phase has run.
    PhaseFinished { phase: Phase },
}

/// A unit that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub id: String,
    pub phase: Phase,
    pub duration: Duration,
}

/// A unit failure recorded under [`FailurePolicy::ContinueOnError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub id: String,
    pub phase: Phase,
    pub error: String,
}

/// Result of running a pipeline.
#[derive(Debug)]
pub struct PipelineReport {
    /// Units that succeeded, in execution order.
    pub executed: Vec<UnitOutcome>,
    /// Units that failed.
    pub failures: Vec<UnitFailure>,
    /// Planning diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Total duration.
    pub duration: Duration,
    /// Final state.
    pub state: PipelineState,
    /// Whether every unit succeeded.
    pub success: bool,
}

/// Discovers, plans and executes units.
///
/// Phases run in order. Each phase is sorted right before it executes, so
/// a cycle in a later phase only surfaces once the earlier phases have
/// run; their effects are not rolled back.
pub struct Pipeline<D> {
    discovery: D,
    failure_policy: FailurePolicy,
    suppress_warnings: bool,
    state: Cell<PipelineState>,
    running: Cell<bool>,
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<D: Discovery> Pipeline<D> {
    /// Create a pipeline over `discovery` with the default policy.
    pub fn new(discovery: D) -> Self {
        Self {
            discovery,
            failure_policy: FailurePolicy::default(),
            suppress_warnings: false,
            state: Cell::new(PipelineState::Idle),
            running: Cell::new(false),
        }
    }

    /// Set the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Stop logging unresolved references.
    pub fn suppress_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// The discovery collaborator.
    pub fn discovery(&self) -> &D {
        &self.discovery
    }

    fn transition(&self, next: PipelineState) {
        debug!("Pipeline: {} -> {}", self.state.get(), next);
        self.state.set(next);
    }

    fn enter(&self) -> Result<RunningGuard<'_>> {
        if self.running.replace(true) {
            return Err(PassflowError::Other(anyhow::anyhow!(
                "pipeline is already running"
            )));
        }
        Ok(RunningGuard(&self.running))
    }

    fn discover(&self) -> Result<Vec<ScheduledUnit>> {
        let units = self.discovery.discover()?;
        ensure_unique_ids(&units)?;
        Ok(units)
    }

    fn fail<T>(&self, err: PassflowError) -> Result<T> {
        self.transition(PipelineState::Failed);
        Err(err)
    }

    /// Plan every phase without running anything.
    pub fn plan(&self) -> Result<Schedule> {
        let _guard = self.enter()?;

        self.transition(PipelineState::Discovering);
        let mut units = match self.discover() {
            Ok(units) => units,
            Err(e) => return self.fail(e),
        };

        self.transition(PipelineState::Expanding);
        expand_job_dependencies(&mut units);

        self.transition(PipelineState::Partitioning);
        match Schedule::build(&units, self.suppress_warnings) {
            Ok(schedule) => {
                self.transition(PipelineState::Idle);
                Ok(schedule)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Report every unresolved reference and cycle without running
    /// anything.
    pub fn check(&self) -> Result<Vec<Diagnostic>> {
        let _guard = self.enter()?;

        let mut units = self.discover()?;
        let mut diagnostics = expand_job_dependencies(&mut units);
        diagnostics.extend(partition::check(&units));
        Ok(diagnostics)
    }

    /// Run the pipeline.
    pub fn run(&self, ctx: &mut ExecutionContext) -> Result<PipelineReport> {
        self.run_with_progress(ctx, |_| {})
    }

    /// Run the pipeline with a progress callback.
    ///
    /// # Errors
    ///
    /// Discovery errors, the first `CircularDependency`, and under
    /// [`FailurePolicy::AbortPipeline`] the first `UnitExecutionFailure`.
    pub fn run_with_progress(
        &self,
        ctx: &mut ExecutionContext,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> Result<PipelineReport> {
        let _guard = self.enter()?;
        let start = Instant::now();

        self.transition(PipelineState::Discovering);
        let mut units = match self.discover() {
            Ok(units) => units,
            Err(e) => return self.fail(e),
        };

        self.transition(PipelineState::Expanding);
        let mut diagnostics = expand_job_dependencies(&mut units);

        self.transition(PipelineState::Partitioning);
        let universe = NameTable::new(&units);
        let groups = partition(&units);

        let mut executed = Vec::new();
        let mut failures = Vec::new();

        for group in &groups {
            let phase = group.phase;

            self.transition(PipelineState::Sorting(phase));
            let plan = match plan_phase(group, &universe, self.suppress_warnings) {
                Ok(plan) => plan,
                Err(e) => return self.fail(e),
            };
            diagnostics.extend(plan.diagnostics);

            self.transition(PipelineState::Executing(phase));
            info!("Running phase {} ({} units)", phase, plan.order.len());
            on_progress(RunProgress::PhaseStarted {
                phase,
                units: plan.order.len(),
            });

            let total = plan.order.len();
            for (index, id) in plan.order.iter().enumerate() {
                let Some(unit) = group.get(id) else {
                    continue;
                };

                on_progress(RunProgress::UnitStarting {
                    id,
                    phase,
                    index,
                    total,
                });

                let unit_start = Instant::now();
                match unit.execute(ctx) {
                    Ok(()) => {
                        let duration = unit_start.elapsed();
                        debug!("Unit '{}' finished in {:?}", id, duration);
                        on_progress(RunProgress::UnitFinished { id, duration });
                        executed.push(UnitOutcome {
                            id: id.clone(),
                            phase,
                            duration,
                        });
                    }
                    Err(source) => {
                        error!("Unit '{}' failed in phase {}: {:#}", id, phase, source);
                        on_progress(RunProgress::UnitFailed { id, error: &source });

                        match self.failure_policy {
                            FailurePolicy::AbortPipeline => {
                                return self.fail(PassflowError::UnitExecutionFailure {
                                    unit: id.clone(),
                                    phase,
                                    source,
                                });
                            }
                            FailurePolicy::ContinueOnError => failures.push(UnitFailure {
                                id: id.clone(),
                                phase,
                                error: format!("{:#}", source),
                            }),
                        }
                    }
                }
            }

            on_progress(RunProgress::PhaseFinished { phase });
        }

        let success = failures.is_empty();
        let state = if success {
            PipelineState::Completed
        } else {
            PipelineState::Failed
        };
        self.transition(state);

        Ok(PipelineReport {
            executed,
            failures,
            diagnostics,
            duration: start.elapsed(),
            state,
            success,
        })
    }
}
