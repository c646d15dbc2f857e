//! Configuration schema definitions for passflow.
//!
//! This module contains all the struct definitions that map to
//! the YAML manifest format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::runner::FailurePolicy;
use crate::unit::Phase;

/// Root configuration structure for `.passflow/config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassflowConfig {
    /// Default subject handed to units (a scene, a file, a target).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Global settings
    pub settings: Settings,

    /// Standalone units, in scheduling order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<UnitConfig>,

    /// Jobs, each a bundle of steps
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<JobConfig>,
}

/// Global settings that apply to every unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// What to do when a unit fails: `abort` or `continue`
    pub failure_policy: FailurePolicy,

    /// Do not log unresolved references
    #[serde(skip_serializing_if = "is_false")]
    pub suppress_warnings: bool,

    /// Shell used to run commands (default: `/bin/sh`, `cmd.exe` on Windows)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Working directory for commands, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Environment variables for every command
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// A standalone unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Unique unit id
    pub id: String,

    /// Phase the unit runs in
    pub phase: Phase,

    /// Shell command; a unit without one only anchors ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Units or steps this unit runs after
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    /// Units or steps this unit runs before
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    /// Jobs whose steps this unit runs after
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after_jobs: Vec<String>,

    /// Jobs whose steps this unit runs before
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before_jobs: Vec<String>,

    /// Extra environment variables for this unit
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// A job: a named bundle of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Job id; steps are scheduled as `<id>.<step name>`
    pub id: String,

    /// Steps, in scheduling order
    pub steps: Vec<StepConfig>,
}

/// One step of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Step name, unique within the job and without `.`
    pub name: String,

    /// Phase the step runs in
    pub phase: Phase,

    /// Shell command; a step without one does nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Step (or unit) ids this step runs after
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after_steps: Vec<String>,

    /// Step (or unit) ids this step runs before
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before_steps: Vec<String>,

    /// Jobs whose steps this step runs after
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after_jobs: Vec<String>,

    /// Jobs whose steps this step runs before
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before_jobs: Vec<String>,

    /// Extra environment variables for this step
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

fn is_false(v: &bool) -> bool {
    !v
}
