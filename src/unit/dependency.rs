//! Dependency declarations.
//!
//! A unit declares *when* it runs relative to others. Each declaration is a
//! [`DependencyReference`]: a target plus a [`Direction`]. Targets are either
//! a direct type identity ([`UnitRef::Direct`]), usable when the declaring
//! code can name the target type, or a textual name ([`UnitRef::Name`]),
//! resolved late for units that live in code the declarer cannot depend on.
//!
//! # Example
//!
//! ```
//! use passflow::unit::{Dependencies, Direction};
//!
//! let deps = Dependencies::builder()
//!     .after_name("assets.generate")
//!     .before_name("assets.pack")
//!     .after_job("lighting")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(deps.units().len(), 2);
//! assert_eq!(deps.jobs()[0].direction, Direction::After);
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::WorkUnit;
use crate::error::{PassflowError, Result};

/// Structural identity of a unit type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics and for name-based lookup.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type path, e.g. `my_passes::lighting::BakePass`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The crate the type is defined in (first path segment).
    pub fn crate_name(&self) -> &'static str {
        self.name.split("::").next().unwrap_or(self.name)
    }

    /// The last path segment, without generic arguments.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// The `"<type path>, <crate>"` form accepted by name references.
    pub fn module_qualified_name(&self) -> String {
        format!("{}, {}", self.name, self.crate_name())
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Ordering relation of a declaration, seen from the declaring unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The declaring unit runs after the target.
    After,
    /// The declaring unit runs before the target.
    Before,
}

impl Direction {
    /// The opposite relation.
    pub fn inverse(self) -> Self {
        match self {
            Direction::After => Direction::Before,
            Direction::Before => Direction::After,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::After => f.write_str("after"),
            Direction::Before => f.write_str("before"),
        }
    }
}

/// The target of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitRef {
    /// A unit type known at declaration time.
    Direct(TypeKey),
    /// A unit id or type name, resolved through the name table.
    Name(String),
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Direct(key) => f.write_str(key.name()),
            UnitRef::Name(name) => f.write_str(name),
        }
    }
}

/// One ordering constraint declared by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyReference {
    pub target: UnitRef,
    pub direction: Direction,
}

impl DependencyReference {
    /// Run after units of type `T`.
    pub fn after<T: WorkUnit>() -> Self {
        Self {
            target: UnitRef::Direct(TypeKey::of::<T>()),
            direction: Direction::After,
        }
    }

    /// Run before units of type `T`.
    pub fn before<T: WorkUnit>() -> Self {
        Self {
            target: UnitRef::Direct(TypeKey::of::<T>()),
            direction: Direction::Before,
        }
    }

    /// Run after the unit reachable by `name`.
    pub fn after_name(name: impl Into<String>) -> Self {
        Self {
            target: UnitRef::Name(name.into()),
            direction: Direction::After,
        }
    }

    /// Run before the unit reachable by `name`.
    pub fn before_name(name: impl Into<String>) -> Self {
        Self {
            target: UnitRef::Name(name.into()),
            direction: Direction::Before,
        }
    }
}

impl fmt::Display for DependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.target)
    }
}

/// Job-level ordering sugar, expanded to step references before scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobReference {
    pub job_id: String,
    pub direction: Direction,
}

/// Everything a unit declares about its ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    units: Vec<DependencyReference>,
    jobs: Vec<JobReference>,
}

impl Dependencies {
    /// No constraints.
    pub fn none() -> Self {
        Self::default()
    }

    /// Start a fluent declaration.
    pub fn builder() -> DependencyBuilder {
        DependencyBuilder::new()
    }

    /// Unit-level references, in declaration order.
    pub fn units(&self) -> &[DependencyReference] {
        &self.units
    }

    /// Job-level references, in declaration order.
    pub fn jobs(&self) -> &[JobReference] {
        &self.jobs
    }

    /// Check if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.jobs.is_empty()
    }

    /// Append a unit reference unless an identical one exists.
    pub(crate) fn push_unit(&mut self, reference: DependencyReference) {
        if !self.units.contains(&reference) {
            self.units.push(reference);
        }
    }
}

/// Fluent builder for [`Dependencies`].
///
/// Validation is deferred to [`build`](Self::build) so calls can be chained.
#[derive(Debug, Default)]
pub struct DependencyBuilder {
    units: Vec<DependencyReference>,
    jobs: Vec<JobReference>,
}

impl DependencyBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run after units of type `T`.
    pub fn after<T: WorkUnit>(mut self) -> Self {
        self.units.push(DependencyReference::after::<T>());
        self
    }

    /// Run before units of type `T`.
    pub fn before<T: WorkUnit>(mut self) -> Self {
        self.units.push(DependencyReference::before::<T>());
        self
    }

    /// Run after the unit reachable by `name` (id or type name).
    pub fn after_name(mut self, name: impl Into<String>) -> Self {
        self.units.push(DependencyReference::after_name(name));
        self
    }

    /// Run before the unit reachable by `name` (id or type name).
    pub fn before_name(mut self, name: impl Into<String>) -> Self {
        self.units.push(DependencyReference::before_name(name));
        self
    }

    /// Run after every step of job `job_id`.
    pub fn after_job(mut self, job_id: impl Into<String>) -> Self {
        self.jobs.push(JobReference {
            job_id: job_id.into(),
            direction: Direction::After,
        });
        self
    }

    /// Run before every step of job `job_id`.
    pub fn before_job(mut self, job_id: impl Into<String>) -> Self {
        self.jobs.push(JobReference {
            job_id: job_id.into(),
            direction: Direction::Before,
        });
        self
    }

    /// Add an already constructed reference.
    pub fn reference(mut self, reference: DependencyReference) -> Self {
        self.units.push(reference);
        self
    }

    /// Validate and build the declarations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeclaration` for empty names and
    /// `ContradictoryConstraint` when a target is both after and before.
    /// A direct reference and a name reference contradict each other when
    /// the name is the type's full path; the `"<type path>, <crate>"` form
    /// is not matched and surfaces later as a cycle.
    pub fn build(self) -> Result<Dependencies> {
        let mut deps = Dependencies::default();

        for reference in self.units {
            if let UnitRef::Name(name) = &reference.target {
                if name.trim().is_empty() {
                    return Err(PassflowError::InvalidDeclaration {
                        message: "dependency name cannot be empty".to_string(),
                    });
                }
            }

            let target = reference.target.to_string();
            let contradicts = deps.units.iter().any(|existing| {
                existing.direction == reference.direction.inverse()
                    && existing.target.to_string() == target
            });
            if contradicts {
                return Err(PassflowError::ContradictoryConstraint { target });
            }

            deps.push_unit(reference);
        }

        for reference in self.jobs {
            if reference.job_id.trim().is_empty() {
                return Err(PassflowError::InvalidDeclaration {
                    message: "job id cannot be empty".to_string(),
                });
            }

            let contradicts = deps
                .jobs
                .iter()
                .any(|j| j.job_id == reference.job_id && j.direction != reference.direction);
            if contradicts {
                return Err(PassflowError::ContradictoryConstraint {
                    target: reference.job_id,
                });
            }

            if !deps.jobs.contains(&reference) {
                deps.jobs.push(reference);
            }
        }

        Ok(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::ExecutionContext;

    struct Setup;
    impl WorkUnit for Setup {
        fn execute(&self, _ctx: &mut ExecutionContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Cleanup;
    impl WorkUnit for Cleanup {
        fn execute(&self, _ctx: &mut ExecutionContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn type_key_equality_uses_type_id() {
        assert_eq!(TypeKey::of::<Setup>(), TypeKey::of::<Setup>());
        assert_ne!(TypeKey::of::<Setup>(), TypeKey::of::<Cleanup>());
    }

    #[test]
    fn type_key_names() {
        let key = TypeKey::of::<Setup>();
        assert_eq!(key.short_name(), "Setup");
        assert_eq!(key.crate_name(), "passflow");
        assert!(key.name().ends_with("::Setup"));
        assert_eq!(
            key.module_qualified_name(),
            format!("{}, passflow", key.name())
        );
    }

    #[test]
    fn builder_preserves_declaration_order() {
        let deps = Dependencies::builder()
            .after::<Setup>()
            .after_name("b")
            .before_name("c")
            .build()
            .unwrap();

        let targets: Vec<_> = deps.units().iter().map(|r| r.target.to_string()).collect();
        assert!(targets[0].ends_with("Setup"));
        assert_eq!(targets[1], "b");
        assert_eq!(targets[2], "c");
    }

    #[test]
    fn builder_collapses_exact_duplicates() {
        let deps = Dependencies::builder()
            .after_name("a")
            .after_name("a")
            .after_job("j")
            .after_job("j")
            .build()
            .unwrap();

        assert_eq!(deps.units().len(), 1);
        assert_eq!(deps.jobs().len(), 1);
    }

    #[test]
    fn builder_rejects_after_and_before_same_name() {
        let result = Dependencies::builder()
            .after_name("X")
            .before_name("X")
            .build();

        assert!(matches!(
            result,
            Err(PassflowError::ContradictoryConstraint { target }) if target == "X"
        ));
    }

    #[test]
    fn builder_rejects_after_and_before_same_type() {
        let result = Dependencies::builder()
            .before::<Cleanup>()
            .after::<Cleanup>()
            .build();

        assert!(matches!(
            result,
            Err(PassflowError::ContradictoryConstraint { .. })
        ));
    }

    #[test]
    fn builder_rejects_contradictory_jobs() {
        let result = Dependencies::builder()
            .after_job("lighting")
            .before_job("lighting")
            .build();

        assert!(matches!(
            result,
            Err(PassflowError::ContradictoryConstraint { target }) if target == "lighting"
        ));
    }

    #[test]
    fn builder_rejects_empty_name() {
        let result = Dependencies::builder().after_name("  ").build();
        assert!(matches!(
            result,
            Err(PassflowError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn builder_rejects_type_and_its_full_name() {
        let result = Dependencies::builder()
            .after::<Setup>()
            .before_name(std::any::type_name::<Setup>())
            .build();

        assert!(matches!(
            result,
            Err(PassflowError::ContradictoryConstraint { target })
                if target == std::any::type_name::<Setup>()
        ));
    }

    #[test]
    fn short_names_are_not_matched_against_types() {
        // Only resolvable at sort time, where it shows up as a cycle.
        let deps = Dependencies::builder()
            .after::<Setup>()
            .before_name("Setup")
            .build();
        assert!(deps.is_ok());
    }

    #[test]
    fn reference_display() {
        assert_eq!(
            DependencyReference::after_name("Missing.Pass").to_string(),
            "after Missing.Pass"
        );
    }
}
