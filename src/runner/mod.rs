//! Unit scheduling and execution.

pub mod graph;
pub mod partition;
pub mod pipeline;
pub mod scheduled;

pub use graph::{Diagnostic, DiagnosticKind, DependencyGraph, GraphBuilder, NameTable, Severity};
pub use partition::{partition, plan_phase, PhaseGroup, PhasePlan, Schedule};
pub use pipeline::{
    FailurePolicy, Pipeline, PipelineReport, PipelineState, RunProgress, UnitFailure, UnitOutcome,
};
pub use scheduled::{ensure_unique_ids, Origin, ScheduledUnit};
