//! Work units: the smallest schedulable pieces of logic.
//!
//! This module provides:
//! - [`WorkUnit`] - the capability every pass implements
//! - [`Phase`] - the coarse ordering buckets
//! - [`Dependencies`] and [`DependencyBuilder`] - ordering declarations
//! - [`ExecutionContext`] - state shared by all units of a run
//! - [`FnUnit`] - a closure-backed unit
//!
//! # Example
//!
//! ```
//! use passflow::unit::{Dependencies, ExecutionContext, Phase, WorkUnit};
//! use passflow::Result;
//!
//! struct ValidateScene;
//!
//! impl WorkUnit for ValidateScene {
//!     fn id(&self) -> String {
//!         "sample.validate".to_string()
//!     }
//!
//!     fn phase(&self) -> Phase {
//!         Phase::PreValidate
//!     }
//!
//!     fn execute(&self, ctx: &mut ExecutionContext) -> anyhow::Result<()> {
//!         ctx.set("validated", true)?;
//!         Ok(())
//!     }
//! }
//!
//! struct ModifyScene;
//!
//! impl WorkUnit for ModifyScene {
//!     fn dependencies(&self) -> Result<Dependencies> {
//!         Dependencies::builder().after::<ValidateScene>().build()
//!     }
//!
//!     fn execute(&self, ctx: &mut ExecutionContext) -> anyhow::Result<()> {
//!         anyhow::ensure!(ctx.get_as::<bool>("validated")?.unwrap_or(false));
//!         Ok(())
//!     }
//! }
//! ```

pub mod context;
pub mod dependency;
pub mod phase;

pub use context::ExecutionContext;
pub use dependency::{
    Dependencies, DependencyBuilder, DependencyReference, Direction, JobReference, TypeKey,
    UnitRef,
};
pub use phase::Phase;

use std::fmt;

use crate::error::Result;

/// A schedulable unit of work.
///
/// Implementing this trait is the whole opt-in: anything registered with a
/// [`UnitRegistry`](crate::registry::UnitRegistry) is scheduled.
pub trait WorkUnit: 'static {
    /// Unique id within one scheduling universe.
    ///
    /// Defaults to the fully qualified type name.
    fn id(&self) -> String {
        std::any::type_name_of_val(self).to_string()
    }

    /// Phase the unit runs in.
    fn phase(&self) -> Phase {
        Phase::default()
    }

    /// Ordering declarations. Read once per discovery.
    fn dependencies(&self) -> Result<Dependencies> {
        Ok(Dependencies::none())
    }

    /// Identity used to resolve direct references.
    ///
    /// Units that share a concrete type with other units (closures, steps,
    /// manifest commands) return `None` and are only reachable by name.
    fn type_key(&self) -> Option<TypeKey> {
        Some(TypeKey::of::<Self>())
    }

    /// Run the unit.
    fn execute(&self, ctx: &mut ExecutionContext) -> anyhow::Result<()>;
}

/// Every name a unit can be reached by through a [`UnitRef::Name`].
///
/// The id, the fully qualified type name, and `"<type path>, <crate>"`.
pub fn unit_names(id: &str, type_key: Option<TypeKey>) -> Vec<String> {
    let mut names = vec![id.to_string()];
    if let Some(key) = type_key {
        for name in [key.name().to_string(), key.module_qualified_name()] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

type UnitAction = Box<dyn Fn(&mut ExecutionContext) -> anyhow::Result<()>>;

/// A unit backed by a closure.
pub struct FnUnit {
    id: String,
    phase: Phase,
    dependencies: Dependencies,
    action: UnitAction,
}

impl FnUnit {
    /// Create a unit running `action` in the default phase.
    pub fn new(
        id: impl Into<String>,
        action: impl Fn(&mut ExecutionContext) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            phase: Phase::default(),
            dependencies: Dependencies::none(),
            action: Box::new(action),
        }
    }

    /// Set the phase.
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the declarations.
    pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
        self.dependencies = dependencies;
        self
    }
}

impl fmt::Debug for FnUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnUnit")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl WorkUnit for FnUnit {
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
        (self.action)(ctx)
    }
}
