//! Coarse execution phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed, totally ordered bucket that units are partitioned into
/// before fine-grained sorting.
///
/// Ordering between phases is implicit: every unit of an earlier phase
/// runs before any unit of a later one, whatever the units declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Checks that must pass before anything is touched.
    PreValidate,
    /// Environment preparation.
    Setup,
    /// Asset and object generation.
    #[default]
    Build,
    /// Transformation of generated output.
    Process,
    /// Size and performance passes.
    Optimize,
    /// Final verification.
    PostValidate,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 6] = [
        Phase::PreValidate,
        Phase::Setup,
        Phase::Build,
        Phase::Process,
        Phase::Optimize,
        Phase::PostValidate,
    ];

    /// The snake_case name used in manifests and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreValidate => "pre_validate",
            Phase::Setup => "setup",
            Phase::Build => "build",
            Phase::Process => "process",
            Phase::Optimize => "optimize",
            Phase::PostValidate => "post_validate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "prevalidate" => Ok(Phase::PreValidate),
            "setup" => Ok(Phase::Setup),
            "build" => Ok(Phase::Build),
            "process" => Ok(Phase::Process),
            "optimize" => Ok(Phase::Optimize),
            "postvalidate" => Ok(Phase::PostValidate),
            _ => Err(format!("unknown phase: {}", s)),
        }
    }
}
