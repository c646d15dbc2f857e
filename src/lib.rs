//! passflow - ordered, phase-based execution of build passes.
//!
//! Units declare which other units they run after or before. passflow
//! groups them by [`Phase`](unit::Phase), orders each phase with a
//! topological sort, and runs them one by one.
//!
//! # Modules
//!
//! - [`unit`] - Work units, phases, and dependency declarations
//! - [`job`] - Jobs: named bundles of steps
//! - [`registry`] - Explicit registration and discovery of units
//! - [`runner`] - Graph building, sorting, partitioning, and execution
//! - [`config`] - YAML manifest loading and validation
//! - [`shell`] - Shell command execution and command-backed units
//! - [`cli`] - Command-line interface
//! - [`ui`] - Terminal output
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use passflow::registry::UnitRegistry;
//! use passflow::runner::Pipeline;
//! use passflow::unit::{Dependencies, ExecutionContext, FnUnit, Phase};
//!
//! let mut registry = UnitRegistry::new();
//! registry
//!     .register(
//!         FnUnit::new("compile", |_| Ok(()))
//!             .with_dependencies(Dependencies::builder().after_name("setup").build().unwrap()),
//!     )
//!     .register(FnUnit::new("setup", |_| Ok(())).in_phase(Phase::Build));
//!
//! let pipeline = Pipeline::new(registry);
//! let report = pipeline.run(&mut ExecutionContext::new("scene")).unwrap();
//! let order: Vec<_> = report.executed.iter().map(|u| u.id.as_str()).collect();
//! assert_eq!(order, vec!["setup", "compile"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod registry;
pub mod runner;
pub mod shell;
pub mod ui;
pub mod unit;

pub use error::{PassflowError, Result};
