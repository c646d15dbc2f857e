//! The scheduling view of a discovered unit.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::error::{PassflowError, Result};
use crate::unit::{unit_names, Dependencies, ExecutionContext, Phase, TypeKey, WorkUnit};

/// Where a scheduled unit came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Registered directly.
    Unit,
    /// A step produced by a job.
    Step { job_id: String },
    /// Created by a plugin.
    Plugin { plugin_id: String },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Unit => f.write_str("unit"),
            Origin::Step { job_id } => write!(f, "step of job '{}'", job_id),
            Origin::Plugin { plugin_id } => write!(f, "plugin '{}'", plugin_id),
        }
    }
}

/// A unit together with everything the scheduler reads from it.
///
/// Id, phase and declarations are snapshotted once, when the unit is
/// wrapped, so sorting never calls back into unit code.
pub struct ScheduledUnit {
    id: String,
    phase: Phase,
    type_key: Option<TypeKey>,
    names: Vec<String>,
    dependencies: Dependencies,
    origin: Origin,
    unit: Rc<dyn WorkUnit>,
}

impl ScheduledUnit {
    /// Wrap a unit, reading its declarations.
    ///
    /// # Errors
    ///
    /// Propagates the unit's `dependencies()` error.
    pub fn new(unit: Rc<dyn WorkUnit>, origin: Origin) -> Result<Self> {
        let dependencies = unit.dependencies()?;
        let id = unit.id();
        let type_key = unit.type_key();
        Ok(Self {
            names: unit_names(&id, type_key),
            phase: unit.phase(),
            id,
            type_key,
            dependencies,
            origin,
            unit,
        })
    }

    /// Wrap a directly registered unit.
    pub fn from_unit(unit: impl WorkUnit) -> Result<Self> {
        Self::new(Rc::new(unit), Origin::Unit)
    }

    /// Unit id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Phase the unit runs in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Direct identity, if the unit has one.
    pub fn type_key(&self) -> Option<TypeKey> {
        self.type_key
    }

    /// Every name the unit can be referenced by.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Declarations, including job references expanded so far.
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut Dependencies {
        &mut self.dependencies
    }

    /// Where the unit came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The wrapped unit.
    pub fn unit(&self) -> &dyn WorkUnit {
        self.unit.as_ref()
    }

    /// Run the wrapped unit.
    pub fn execute(&self, ctx: &mut ExecutionContext) -> anyhow::Result<()> {
        self.unit.execute(ctx)
    }
}

impl fmt::Debug for ScheduledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledUnit")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("names", &self.names)
            .field("dependencies", &self.dependencies)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Reject a unit set in which two units share an id.
///
/// # Errors
///
/// `DuplicateUnit` naming the first repeated id.
pub fn ensure_unique_ids(units: &[ScheduledUnit]) -> Result<()> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.id()) {
            return Err(PassflowError::DuplicateUnit {
                id: unit.id().to_string(),
            });
        }
    }
    Ok(())
}
