//! Dependency graph construction and topological sorting.
//!
//! [`GraphBuilder`] turns the declarations of one unit set into a
//! [`DependencyGraph`]: `After(T)` on unit `U` becomes the edge `T -> U`,
//! `Before(T)` becomes `U -> T`. [`DependencyGraph::topological_order`]
//! then runs Kahn's algorithm over it.
//!
//! Ordering is deterministic: nodes keep the order the units were given in
//! and successors keep the order their edges were added in.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use super::ScheduledUnit;
use crate::error::{PassflowError, Result};
use crate::unit::{DependencyReference, Direction, Phase, TypeKey, UnitRef};

/// Severity of a scheduling diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A reference resolved to no unit; its edge was dropped.
    UnresolvedReference { target: String, direction: Direction },
    /// A job reference named a job with no steps.
    UnknownJob { job_id: String, direction: Direction },
    /// A phase could not be ordered.
    CircularDependency {
        phase: Phase,
        units: Vec<String>,
        cycle: Option<Vec<String>>,
    },
}

/// A non-fatal finding produced while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub unit: String,
    pub message: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Unresolved reference from `unit`.
    pub fn unresolved(unit: &str, reference: &DependencyReference) -> Self {
        let target = reference.target.to_string();
        let message = PassflowError::UnresolvedReference {
            unit: unit.to_string(),
            target: target.clone(),
            direction: reference.direction,
        }
        .to_string();
        Self {
            severity: Severity::Warning,
            unit: unit.to_string(),
            message,
            kind: DiagnosticKind::UnresolvedReference {
                target,
                direction: reference.direction,
            },
        }
    }

    /// Job reference from `unit` that expanded to nothing.
    pub fn unknown_job(unit: &str, job_id: &str, direction: Direction) -> Self {
        Self {
            severity: Severity::Info,
            unit: unit.to_string(),
            message: format!(
                "Unit '{}' runs {} job '{}' which has no steps",
                unit, direction, job_id
            ),
            kind: DiagnosticKind::UnknownJob {
                job_id: job_id.to_string(),
                direction,
            },
        }
    }

    /// A cycle in `phase`. `unit` is the first stuck unit.
    pub fn cycle(phase: Phase, units: Vec<String>, cycle: Option<Vec<String>>) -> Self {
        let message = match &cycle {
            Some(path) => format!(
                "Circular dependency detected in phase {}: {}",
                phase,
                path.join(" -> ")
            ),
            None => format!(
                "Circular dependency detected in phase {}: {}",
                phase,
                units.join(", ")
            ),
        };
        Self {
            severity: Severity::Error,
            unit: units.first().cloned().unwrap_or_default(),
            message,
            kind: DiagnosticKind::CircularDependency {
                phase,
                units,
                cycle,
            },
        }
    }

    /// Check if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Lookup from every name and type key of a unit set to node indices.
///
/// Scoped to the units it was built from: a target outside that set does
/// not resolve. A type registered under several ids resolves to each of
/// them.
#[derive(Debug, Default)]
pub struct NameTable {
    by_name: HashMap<String, Vec<usize>>,
    by_type: HashMap<TypeKey, Vec<usize>>,
}

impl NameTable {
    /// Index the given units in order.
    pub fn new<'a>(units: impl IntoIterator<Item = &'a ScheduledUnit>) -> Self {
        let mut table = Self::default();
        for (index, unit) in units.into_iter().enumerate() {
            for name in unit.names() {
                let slot = table.by_name.entry(name.clone()).or_default();
                if !slot.contains(&index) {
                    slot.push(index);
                }
            }
            if let Some(key) = unit.type_key() {
                table.by_type.entry(key).or_default().push(index);
            }
        }
        table
    }

    /// Indices of every unit `target` refers to, in unit order.
    pub fn resolve(&self, target: &UnitRef) -> &[usize] {
        let found = match target {
            UnitRef::Direct(key) => self.by_type.get(key),
            UnitRef::Name(name) => self.by_name.get(name),
        };
        found.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if `target` refers to any unit of the set.
    pub fn contains(&self, target: &UnitRef) -> bool {
        !self.resolve(target).is_empty()
    }

    /// Number of distinct names indexed.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if no names are indexed.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Directed graph over the units of one phase.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    phase: Phase,
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
}

impl DependencyGraph {
    /// Create an empty graph for `phase`.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            nodes: Vec::new(),
            index: HashMap::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node, returning its index. Existing ids keep their index.
    pub fn add_node(&mut self, id: impl Into<String>) -> usize {
        let id = id.into();
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let index = self.nodes.len();
        self.index.insert(id.clone(), index);
        self.nodes.push(id);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        index
    }

    /// Add the edge `from -> to` between existing nodes.
    ///
    /// Returns `false` when either node is missing or the edge exists.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        match (self.index.get(from).copied(), self.index.get(to).copied()) {
            (Some(from), Some(to)) => self.link(from, to),
            _ => false,
        }
    }

    fn link(&mut self, from: usize, to: usize) -> bool {
        if self.successors[from].contains(&to) {
            return false;
        }
        self.successors[from].push(to);
        self.predecessors[to].push(from);
        self.edges.push((from, to));
        true
    }

    /// Phase the graph orders.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Node ids in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges
            .iter()
            .map(|&(from, to)| (self.nodes[from].as_str(), self.nodes[to].as_str()))
    }

    /// Check if a node exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Check if the edge `from -> to` exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from), Some(to)) => self.successors[from].contains(to),
            _ => false,
        }
    }

    /// Nodes that must run after `id`, in edge insertion order.
    pub fn successors_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, &self.successors)
    }

    /// Nodes that must run before `id`, in edge insertion order.
    pub fn predecessors_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, &self.predecessors)
    }

    fn neighbours<'a>(&'a self, id: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a str> {
        self.index
            .get(id)
            .map(|&i| {
                adjacency[i]
                    .iter()
                    .map(|&n| self.nodes[n].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of distinct incoming edges of `id`.
    pub fn in_degree(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&i| self.predecessors[i].len())
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns node ids in topological order.
    ///
    /// The queue starts with every node without incoming edges, in
    /// insertion order; a node is released once its last predecessor has
    /// been emitted, in the order its edges were added.
    ///
    /// # Errors
    ///
    /// `CircularDependency` listing every node that was never emitted, in
    /// insertion order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut emitted = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop_front() {
            emitted[node] = true;
            order.push(self.nodes[node].clone());

            for &next in &self.successors[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let units = self
                .nodes
                .iter()
                .zip(&emitted)
                .filter(|(_, &done)| !done)
                .map(|(id, _)| id.clone())
                .collect();
            return Err(PassflowError::CircularDependency {
                phase: self.phase,
                units,
            });
        }

        Ok(order)
    }

    /// Find a cycle in the graph, returning the path if one exists.
    ///
    /// The path starts and ends with the same node, e.g. `[a, b, a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &DependencyGraph,
            state: &mut [State],
            path: &mut Vec<usize>,
        ) -> Option<Vec<String>> {
            state[node] = State::Visiting;
            path.push(node);

            for &next in &graph.successors[node] {
                match state[next] {
                    State::Visiting => {
                        let start = path.iter().position(|&n| n == next)?;
                        let mut cycle: Vec<String> = path[start..]
                            .iter()
                            .map(|&n| graph.nodes[n].clone())
                            .collect();
                        cycle.push(graph.nodes[next].clone());
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(next, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.nodes.len()];
        let mut path = Vec::new();

        for node in 0..self.nodes.len() {
            if state[node] == State::Unvisited {
                if let Some(cycle) = dfs(node, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}

/// Builds a [`DependencyGraph`] from a set of scheduled units.
pub struct GraphBuilder<'a> {
    phase: Phase,
    units: Vec<&'a ScheduledUnit>,
    universe: Option<&'a NameTable>,
    suppress_warnings: bool,
}

impl<'a> GraphBuilder<'a> {
    /// Graph the given units as one ordering scope.
    pub fn new(phase: Phase, units: impl IntoIterator<Item = &'a ScheduledUnit>) -> Self {
        Self {
            phase,
            units: units.into_iter().collect(),
            universe: None,
            suppress_warnings: false,
        }
    }

    /// Names known outside this scope.
    ///
    /// A reference that misses the scope but resolves here is skipped
    /// without a diagnostic.
    pub fn universe(mut self, universe: &'a NameTable) -> Self {
        self.universe = Some(universe);
        self
    }

    /// Collect diagnostics without logging them.
    pub fn suppress_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    /// Build the graph, reporting references that resolve nowhere.
    ///
    /// Units sharing an id collapse into the first one's node; callers
    /// reject such sets up front with [`ensure_unique_ids`].
    ///
    /// [`ensure_unique_ids`]: super::scheduled::ensure_unique_ids
    pub fn build(self) -> (DependencyGraph, Vec<Diagnostic>) {
        let table = NameTable::new(self.units.iter().copied());
        let mut graph = DependencyGraph::new(self.phase);
        let mut diagnostics = Vec::new();

        let nodes: Vec<usize> = self
            .units
            .iter()
            .map(|unit| graph.add_node(unit.id()))
            .collect();

        for (index, unit) in self.units.iter().enumerate() {
            for reference in unit.dependencies().units() {
                let targets = table.resolve(&reference.target);
                if !targets.is_empty() {
                    for &target in targets {
                        match reference.direction {
                            Direction::After => graph.link(nodes[target], nodes[index]),
                            Direction::Before => graph.link(nodes[index], nodes[target]),
                        };
                    }
                } else if self
                    .universe
                    .is_some_and(|universe| universe.contains(&reference.target))
                {
                    debug!(
                        "Ignoring cross-phase reference: '{}' runs {}",
                        unit.id(),
                        reference
                    );
                } else {
                    let diagnostic = Diagnostic::unresolved(unit.id(), reference);
                    if !self.suppress_warnings {
                        warn!("{}", diagnostic.message);
                    }
                    diagnostics.push(diagnostic);
                }
            }
        }

        (graph, diagnostics)
    }
}
