//! Error types for passflow operations.
//!
//! This module defines [`PassflowError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Structural errors (contradictions, duplicates, cycles) are fatal and are
//!   raised before any unit in the affected scope executes
//! - Unresolved references are never returned from planning; they surface as
//!   warning [`Diagnostic`](crate::runner::Diagnostic)s and the edge is dropped
//! - Unit callbacks fail with `anyhow::Error`, which the executor wraps in
//!   [`PassflowError::UnitExecutionFailure`]

use std::path::PathBuf;
use thiserror::Error;

use crate::unit::{Direction, Phase};

/// Core error type for passflow operations.
#[derive(Debug, Error)]
pub enum PassflowError {
    /// A unit declares both `After` and `Before` for the same target.
    #[error("Contradictory constraint: '{target}' is declared both after and before")]
    ContradictoryConstraint { target: String },

    /// A declaration is malformed (empty name, bad step name, ...).
    #[error("Invalid declaration: {message}")]
    InvalidDeclaration { message: String },

    /// Two units in one scheduling universe share an id.
    #[error("Duplicate unit id: {id}")]
    DuplicateUnit { id: String },

    /// A dependency target is absent from the current scheduling universe.
    ///
    /// Non-fatal: reported as a diagnostic and the edge is omitted.
    #[error("Unit '{unit}' runs {direction} '{target}' which is not in the current unit set")]
    UnresolvedReference {
        unit: String,
        target: String,
        direction: Direction,
    },

    /// The units of a phase could not be ordered.
    ///
    /// `units` lists every unit that was never dequeued: the units on a
    /// cycle plus everything chained behind one.
    #[error("Circular dependency detected in phase {phase}: {}", .units.join(", "))]
    CircularDependency { phase: Phase, units: Vec<String> },

    /// A unit's callback failed during execution.
    #[error("Unit '{unit}' failed in phase {phase}: {source:#}")]
    UnitExecutionFailure {
        unit: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// Shell command failed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PassflowError {
    /// Whether this error aborts scheduling before any unit runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ContradictoryConstraint { .. }
                | Self::InvalidDeclaration { .. }
                | Self::DuplicateUnit { .. }
                | Self::CircularDependency { .. }
        )
    }
}

/// Result type alias for passflow operations.
pub type Result<T> = std::result::Result<T, PassflowError>;
