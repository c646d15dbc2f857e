//! Unit discovery.
//!
//! Units, jobs and plugins are registered explicitly with a
//! [`UnitRegistry`]. Every call to [`Discovery::discover`] instantiates all
//! of them afresh, in registration order, and wraps them as
//! [`ScheduledUnit`]s ready for planning.
//!
//! # Example
//!
//! ```
//! use passflow::registry::{Discovery, UnitRegistry};
//! use passflow::unit::{FnUnit, Phase};
//!
//! let mut registry = UnitRegistry::new();
//! registry.register(FnUnit::new("setup", |_| Ok(())).in_phase(Phase::Setup));
//! registry.register_factory(|| Ok(FnUnit::new("build", |_| Ok(()))));
//!
//! let units = registry.discover().unwrap();
//! assert_eq!(units.len(), 2);
//! ```

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::{PassflowError, Result};
use crate::job::Job;
use crate::runner::{Origin, ScheduledUnit};
use crate::unit::WorkUnit;

/// Produces the unit set of one run.
pub trait Discovery {
    /// Enumerate and instantiate every unit.
    ///
    /// # Errors
    ///
    /// Only fatal problems, such as `DuplicateUnit`. Units that fail to
    /// instantiate are logged and skipped.
    fn discover(&self) -> Result<Vec<ScheduledUnit>>;
}

impl<F> Discovery for F
where
    F: Fn() -> Result<Vec<ScheduledUnit>>,
{
    fn discover(&self) -> Result<Vec<ScheduledUnit>> {
        self()
    }
}

/// A bundle of units and jobs contributed by one extension.
pub trait Plugin: 'static {
    /// Id of the plugin, used in logs and unit origins.
    fn plugin_id(&self) -> String;

    /// Units the plugin contributes.
    fn create_units(&self) -> Vec<Box<dyn WorkUnit>> {
        Vec::new()
    }

    /// Jobs the plugin contributes.
    fn create_jobs(&self) -> Vec<Box<dyn Job>> {
        Vec::new()
    }
}

type UnitFactory = Box<dyn Fn() -> anyhow::Result<Rc<dyn WorkUnit>>>;
type JobFactory = Box<dyn Fn() -> anyhow::Result<Rc<dyn Job>>>;

enum Registration {
    Unit { label: String, factory: UnitFactory },
    Job { label: String, factory: JobFactory },
    Plugin(Box<dyn Plugin>),
}

/// Explicit registry of everything that should be scheduled.
#[derive(Default)]
pub struct UnitRegistry {
    registrations: Vec<Registration>,
}

impl UnitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit instance. The same instance is handed out by every
    /// discovery.
    pub fn register<U: WorkUnit>(&mut self, unit: U) -> &mut Self {
        let unit: Rc<dyn WorkUnit> = Rc::new(unit);
        self.registrations.push(Registration::Unit {
            label: std::any::type_name::<U>().to_string(),
            factory: Box::new(move || Ok(Rc::clone(&unit))),
        });
        self
    }

    /// Register a factory called once per discovery.
    pub fn register_factory<U, F>(&mut self, factory: F) -> &mut Self
    where
        U: WorkUnit,
        F: Fn() -> anyhow::Result<U> + 'static,
    {
        self.registrations.push(Registration::Unit {
            label: std::any::type_name::<U>().to_string(),
            factory: Box::new(move || Ok(Rc::new(factory()?) as Rc<dyn WorkUnit>)),
        });
        self
    }

    /// Register a job instance.
    pub fn register_job<J: Job>(&mut self, job: J) -> &mut Self {
        let job: Rc<dyn Job> = Rc::new(job);
        self.registrations.push(Registration::Job {
            label: std::any::type_name::<J>().to_string(),
            factory: Box::new(move || Ok(Rc::clone(&job))),
        });
        self
    }

    /// Register a job factory called once per discovery.
    pub fn register_job_factory<J, F>(&mut self, factory: F) -> &mut Self
    where
        J: Job,
        F: Fn() -> anyhow::Result<J> + 'static,
    {
        self.registrations.push(Registration::Job {
            label: std::any::type_name::<J>().to_string(),
            factory: Box::new(move || Ok(Rc::new(factory()?) as Rc<dyn Job>)),
        });
        self
    }

    /// Register a plugin.
    pub fn register_plugin(&mut self, plugin: impl Plugin) -> &mut Self {
        self.registrations.push(Registration::Plugin(Box::new(plugin)));
        self
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Discovery for UnitRegistry {
    fn discover(&self) -> Result<Vec<ScheduledUnit>> {
        let mut collector = Collector::default();

        for registration in &self.registrations {
            match registration {
                Registration::Unit { label, factory } => match factory() {
                    Ok(unit) => collector.add_unit(unit, Origin::Unit)?,
                    Err(e) => error!("Failed to create unit {}: {:#}", label, e),
                },
                Registration::Job { label, factory } => match factory() {
                    Ok(job) => collector.add_job(job.as_ref())?,
                    Err(e) => error!("Failed to create job {}: {:#}", label, e),
                },
                Registration::Plugin(plugin) => {
                    let plugin_id = plugin.plugin_id();
                    debug!("Loading plugin '{}'", plugin_id);
                    for unit in plugin.create_units() {
                        collector.add_unit(
                            Rc::from(unit),
                            Origin::Plugin {
                                plugin_id: plugin_id.clone(),
                            },
                        )?;
                    }
                    for job in plugin.create_jobs() {
                        collector.add_job(job.as_ref())?;
                    }
                }
            }
        }

        debug!("Discovered {} units", collector.units.len());
        Ok(collector.units)
    }
}

#[derive(Default)]
struct Collector {
    units: Vec<ScheduledUnit>,
    seen: HashSet<String>,
}

impl Collector {
    fn add_unit(&mut self, unit: Rc<dyn WorkUnit>, origin: Origin) -> Result<()> {
        let id = unit.id();
        match ScheduledUnit::new(unit, origin) {
            Ok(scheduled) => self.push(scheduled),
            Err(e) => {
                error!("Skipping unit '{}': {}", id, e);
                Ok(())
            }
        }
    }

    fn add_job(&mut self, job: &dyn Job) -> Result<()> {
        let job_id = job.job_id();
        let steps = match crate::job::instantiate(job) {
            Ok(steps) => steps,
            Err(e) => {
                error!("Skipping job '{}': {}", job_id, e);
                return Ok(());
            }
        };

        for step in steps {
            let origin = Origin::Step {
                job_id: job_id.clone(),
            };
            self.add_unit(Rc::new(step), origin)?;
        }
        Ok(())
    }

    fn push(&mut self, unit: ScheduledUnit) -> Result<()> {
        if !self.seen.insert(unit.id().to_string()) {
            return Err(PassflowError::DuplicateUnit {
                id: unit.id().to_string(),
            });
        }
        self.units.push(unit);
        Ok(())
    }
}
