//! Phase partitioning and per-phase planning.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, error};

use super::graph::{Diagnostic, GraphBuilder, NameTable};
use super::scheduled::{ensure_unique_ids, ScheduledUnit};
use crate::error::{PassflowError, Result};
use crate::unit::Phase;

/// The units of one phase, in discovery order.
#[derive(Debug)]
pub struct PhaseGroup<'a> {
    pub phase: Phase,
    pub units: Vec<&'a ScheduledUnit>,
}

impl<'a> PhaseGroup<'a> {
    /// Look up a unit of the group by id.
    pub fn get(&self, id: &str) -> Option<&'a ScheduledUnit> {
        self.units.iter().copied().find(|unit| unit.id() == id)
    }
}

/// Group units by phase.
///
/// Groups come in ascending phase order and keep the discovery
/// order of their units. Phases without units are left out.
pub fn partition(units: &[ScheduledUnit]) -> Vec<PhaseGroup<'_>> {
    Phase::ALL
        .iter()
        .map(|&phase| PhaseGroup {
            phase,
            units: units.iter().filter(|unit| unit.phase() == phase).collect(),
        })
        .filter(|group| !group.units.is_empty())
        .collect()
}

/// Sorted order of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhasePlan {
    pub phase: Phase,
    pub order: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build and sort the graph of one phase.
///
/// References that only resolve in another phase of `universe` are inert.
///
/// # Errors
///
/// `CircularDependency` when the phase cannot be ordered.
pub fn plan_phase(
    group: &PhaseGroup<'_>,
    universe: &NameTable,
    suppress_warnings: bool,
) -> Result<PhasePlan> {
    let (graph, diagnostics) = GraphBuilder::new(group.phase, group.units.iter().copied())
        .universe(universe)
        .suppress_warnings(suppress_warnings)
        .build();

    let order = graph.topological_order().inspect_err(|_| {
        if let Some(cycle) = graph.find_cycle() {
            error!(
                "Circular dependency in phase {}: {}",
                group.phase,
                cycle.join(" -> ")
            );
        }
    })?;

    debug!("Phase {} ordered: {}", group.phase, order.join(", "));

    Ok(PhasePlan {
        phase: group.phase,
        order,
        diagnostics,
    })
}

/// Execution order of a whole unit set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub phases: Vec<PhasePlan>,
}

impl Schedule {
    /// Partition and sort every phase.
    ///
    /// # Errors
    ///
    /// `DuplicateUnit` when two units share an id, otherwise the first
    /// `CircularDependency` in phase order.
    pub fn build(units: &[ScheduledUnit], suppress_warnings: bool) -> Result<Self> {
        ensure_unique_ids(units)?;
        let universe = NameTable::new(units);
        let phases = partition(units)
            .iter()
            .map(|group| plan_phase(group, &universe, suppress_warnings))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { phases })
    }

    /// All ids in execution order.
    pub fn ordered_ids(&self) -> Vec<&str> {
        self.phases
            .iter()
            .flat_map(|plan| plan.order.iter().map(String::as_str))
            .collect()
    }

    /// Every diagnostic, in phase order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.phases.iter().flat_map(|plan| plan.diagnostics.iter())
    }

    /// Restrict the already sorted plan to ids matching `pattern`.
    ///
    /// Relative order is unchanged; phases left empty are dropped.
    pub fn filter(&self, pattern: &Regex) -> Self {
        let phases = self
            .phases
            .iter()
            .map(|plan| PhasePlan {
                phase: plan.phase,
                order: plan
                    .order
                    .iter()
                    .filter(|id| pattern.is_match(id))
                    .cloned()
                    .collect(),
                diagnostics: plan
                    .diagnostics
                    .iter()
                    .filter(|d| pattern.is_match(&d.unit))
                    .cloned()
                    .collect(),
            })
            .filter(|plan| !plan.order.is_empty())
            .collect();
        Self { phases }
    }

    /// Total number of scheduled units.
    pub fn len(&self) -> usize {
        self.phases.iter().map(|plan| plan.order.len()).sum()
    }

    /// Check if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plan every phase without stopping at the first cycle.
///
/// Unresolved references and cycles (with a concrete path) are all
/// returned as diagnostics. Nothing is logged.
pub fn check(units: &[ScheduledUnit]) -> Vec<Diagnostic> {
    let universe = NameTable::new(units);
    let mut diagnostics = Vec::new();

    for group in partition(units) {
        let (graph, mut found) = GraphBuilder::new(group.phase, group.units.iter().copied())
            .universe(&universe)
            .suppress_warnings(true)
            .build();
        diagnostics.append(&mut found);

        if let Err(PassflowError::CircularDependency { phase, units }) = graph.topological_order()
        {
            diagnostics.push(Diagnostic::cycle(phase, units, graph.find_cycle()));
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{Dependencies, FnUnit};

    fn unit(id: &str, phase: Phase, after: &[&str]) -> ScheduledUnit {
        let deps = after
            .iter()
            .fold(Dependencies::builder(), |b, n| b.after_name(*n))
            .build()
            .unwrap();
        ScheduledUnit::from_unit(
            FnUnit::new(id, |_| Ok(()))
                .in_phase(phase)
                .with_dependencies(deps),
        )
        .unwrap()
    }

    #[test]
    fn partition_orders_phases_and_skips_empty_ones() {
        let units = vec![
            unit("opt", Phase::Optimize, &[]),
            unit("pre", Phase::PreValidate, &[]),
            unit("build1", Phase::Build, &[]),
            unit("build2", Phase::Build, &[]),
        ];

        let groups = partition(&units);
        let phases: Vec<_> = groups.iter().map(|g| g.phase).collect();
        assert_eq!(phases, vec![Phase::PreValidate, Phase::Build, Phase::Optimize]);

        let build: Vec<_> = groups[1].units.iter().map(|u| u.id()).collect();
        assert_eq!(build, vec!["build1", "build2"]);
    }

    #[test]
    fn partition_of_nothing_is_empty() {
        assert!(partition(&[]).is_empty());
    }

    #[test]
    fn group_lookup_by_id() {
        let units = vec![unit("a", Phase::Build, &[])];
        let groups = partition(&units);
        assert!(groups[0].get("a").is_some());
        assert!(groups[0].get("b").is_none());
    }

    #[test]
    fn cross_phase_references_are_inert() {
        // "early" asks to run after a later-phase unit; phases win.
        let units = vec![
            unit("late", Phase::PostValidate, &[]),
            unit("early", Phase::PreValidate, &["late"]),
        ];

        let schedule = Schedule::build(&units, false).unwrap();
        assert_eq!(schedule.ordered_ids(), vec!["early", "late"]);
        assert_eq!(schedule.diagnostics().count(), 0);
    }

    #[test]
    fn references_missing_from_universe_are_reported() {
        let units = vec![unit("x", Phase::Build, &["Missing.Pass"])];
        let schedule = Schedule::build(&units, true).unwrap();

        assert_eq!(schedule.ordered_ids(), vec!["x"]);
        assert_eq!(schedule.diagnostics().count(), 1);
    }

    #[test]
    fn cycle_in_any_phase_fails_build() {
        let units = vec![
            unit("ok", Phase::Setup, &[]),
            unit("a", Phase::Process, &["b"]),
            unit("b", Phase::Process, &["a"]),
        ];

        let result = Schedule::build(&units, false);
        assert!(matches!(
            result,
            Err(PassflowError::CircularDependency { phase: Phase::Process, .. })
        ));
    }

    #[test]
    fn filter_keeps_relative_order() {
        let units = vec![
            unit("asset.pack", Phase::Build, &["asset.generate"]),
            unit("shader.compile", Phase::Build, &[]),
            unit("asset.generate", Phase::Build, &[]),
            unit("asset.verify", Phase::PostValidate, &[]),
        ];
        let schedule = Schedule::build(&units, false).unwrap();
        let filtered = schedule.filter(&Regex::new("^asset").unwrap());

        assert_eq!(
            filtered.ordered_ids(),
            vec!["asset.generate", "asset.pack", "asset.verify"]
        );
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn filter_drops_phases_without_matches() {
        let units = vec![
            unit("a", Phase::Setup, &[]),
            unit("b", Phase::Build, &[]),
        ];
        let schedule = Schedule::build(&units, false).unwrap();
        let filtered = schedule.filter(&Regex::new("^b$").unwrap());

        assert_eq!(filtered.phases.len(), 1);
        assert_eq!(filtered.phases[0].phase, Phase::Build);
    }

    #[test]
    fn check_collects_all_findings() {
        let units = vec![
            unit("a", Phase::Setup, &["b"]),
            unit("b", Phase::Setup, &["a"]),
            unit("c", Phase::Build, &["nowhere"]),
            unit("d", Phase::Process, &["d"]),
        ];

        let diagnostics = check(&units);
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(diagnostics.len(), 3);
        assert!(errors[0].message.contains(" -> "));
    }
}
