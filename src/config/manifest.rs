//! Turning a manifest into schedulable units.
//!
//! Every `units:` entry becomes a [`CommandUnit`]. Every `jobs:` entry
//! becomes a [`ManifestJob`] whose steps run their commands through
//! [`run_command`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::loader::load_config;
use crate::config::schema::{JobConfig, PassflowConfig, Settings};
use crate::config::validator::validate;
use crate::error::Result;
use crate::job::{Job, JobBuilder};
use crate::registry::{Discovery, UnitRegistry};
use crate::runner::ScheduledUnit;
use crate::shell::{run_command, CommandOptions, CommandUnit};
use crate::unit::Dependencies;

/// A loaded and validated manifest, anchored at its project root.
#[derive(Debug, Clone)]
pub struct Manifest {
    config: PassflowConfig,
    project_root: PathBuf,
}

impl Manifest {
    /// Wrap an already loaded configuration.
    pub fn new(config: PassflowConfig, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_root: project_root.into(),
        }
    }

    /// Load and validate the manifest of `project_root`.
    ///
    /// # Errors
    ///
    /// Loader errors, or `ConfigValidationError` when validation fails.
    pub fn load(project_root: &Path, config_override: Option<&Path>) -> Result<Self> {
        let config = load_config(project_root, config_override)?;
        validate(&config)?;
        debug!(
            "Loaded manifest with {} units and {} jobs",
            config.units.len(),
            config.jobs.len()
        );
        Ok(Self::new(config, project_root))
    }

    pub fn config(&self) -> &PassflowConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Subject handed to units when none is given on the command line.
    pub fn subject(&self) -> &str {
        self.config.subject.as_deref().unwrap_or_default()
    }

    fn options(&self, env: &std::collections::HashMap<String, String>) -> CommandOptions {
        command_options(&self.config.settings, &self.project_root, env)
    }

    /// Build a registry holding every unit and job of the manifest.
    ///
    /// # Errors
    ///
    /// `ContradictoryConstraint` or `InvalidDeclaration` for a unit whose
    /// declarations do not build.
    pub fn registry(&self) -> Result<UnitRegistry> {
        let mut registry = UnitRegistry::new();

        for unit in &self.config.units {
            let mut deps = Dependencies::builder();
            for target in &unit.after {
                deps = deps.after_name(target);
            }
            for target in &unit.before {
                deps = deps.before_name(target);
            }
            for job in &unit.after_jobs {
                deps = deps.after_job(job);
            }
            for job in &unit.before_jobs {
                deps = deps.before_job(job);
            }

            registry.register(
                CommandUnit::new(&unit.id, unit.command.clone())
                    .in_phase(unit.phase)
                    .with_dependencies(deps.build()?)
                    .with_options(self.options(&unit.env)),
            );
        }

        for job in &self.config.jobs {
            registry.register_job(ManifestJob {
                config: job.clone(),
                settings: self.config.settings.clone(),
                project_root: self.project_root.clone(),
            });
        }

        Ok(registry)
    }
}

impl Discovery for Manifest {
    fn discover(&self) -> Result<Vec<ScheduledUnit>> {
        self.registry()?.discover()
    }
}

fn command_options(
    settings: &Settings,
    project_root: &Path,
    env: &std::collections::HashMap<String, String>,
) -> CommandOptions {
    let mut merged = settings.env.clone();
    merged.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));

    CommandOptions {
        cwd: Some(match &settings.working_dir {
            Some(dir) => project_root.join(dir),
            None => project_root.to_path_buf(),
        }),
        env: merged,
        shell: settings.shell.clone(),
        ..Default::default()
    }
}

/// A job declared in the manifest.
#[derive(Debug, Clone)]
pub struct ManifestJob {
    config: JobConfig,
    settings: Settings,
    project_root: PathBuf,
}

impl Job for ManifestJob {
    fn job_id(&self) -> String {
        self.config.id.clone()
    }

    fn configure(&self, job: &mut JobBuilder) -> Result<()> {
        for step in &self.config.steps {
            let builder = job.add_step(step.phase, &step.name);
            for target in &step.after_steps {
                builder.run_after_step(target);
            }
            for target in &step.before_steps {
                builder.run_before_step(target);
            }
            for target in &step.after_jobs {
                builder.run_after_job(target);
            }
            for target in &step.before_jobs {
                builder.run_before_job(target);
            }

            if let Some(command) = step.command.clone() {
                let options = command_options(&self.settings, &self.project_root, &step.env);
                let id = builder.id().to_string();
                let phase = step.phase;
                builder.execute(move |ctx| Ok(run_command(&command, &options, ctx, &id, phase)?));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{ExecutionContext, Phase};
    use std::fs;
    use tempfile::TempDir;

    fn manifest(yaml: &str, root: &Path) -> Manifest {
        Manifest::new(serde_yaml::from_str(yaml).unwrap(), root)
    }

    #[test]
    fn units_and_steps_are_discovered_in_manifest_order() {
        let temp = TempDir::new().unwrap();
        let m = manifest(
            r#"
units:
  - id: compile
  - id: setup
    phase: setup
jobs:
  - id: assets
    steps:
      - name: generate
      - name: pack
        phase: optimize
"#,
            temp.path(),
        );

        let units = m.discover().unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec!["compile", "setup", "assets.generate", "assets.pack"]);
        assert_eq!(units[1].phase(), Phase::Setup);
        assert_eq!(units[3].phase(), Phase::Optimize);
    }

    #[test]
    fn declarations_carry_over() {
        let temp = TempDir::new().unwrap();
        let m = manifest(
            "units:\n  - id: a\n    after: [b]\n    before_jobs: [j]\n",
            temp.path(),
        );

        let units = m.discover().unwrap();
        let deps = units[0].dependencies();
        assert_eq!(deps.units().len(), 1);
        assert_eq!(deps.jobs().len(), 1);
    }

    #[test]
    fn contradictory_unit_fails_registry() {
        let temp = TempDir::new().unwrap();
        let m = manifest(
            "units:\n  - id: a\n    after: [b]\n    before: [b]\n",
            temp.path(),
        );
        assert!(m.registry().is_err());
    }

    #[test]
    fn commands_run_in_working_dir_with_merged_env() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("out")).unwrap();
        let m = manifest(
            r#"
settings:
  working_dir: out
  env:
    GREETING: hello
    TARGET: base
jobs:
  - id: j
    steps:
      - name: write
        command: echo "$GREETING $TARGET $PASSFLOW_UNIT" > step.txt
        env:
          TARGET: step
"#,
            temp.path(),
        );

        let units = m.discover().unwrap();
        let mut ctx = ExecutionContext::new("s");
        units[0].execute(&mut ctx).unwrap();

        let written = fs::read_to_string(temp.path().join("out").join("step.txt")).unwrap();
        assert_eq!(written.trim(), "hello step j.write");
    }

    #[test]
    fn load_validates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".passflow");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), "units:\n  - id: a\n  - id: a\n").unwrap();

        assert!(Manifest::load(temp.path(), None).is_err());
    }

    #[test]
    fn subject_defaults_to_empty() {
        let temp = TempDir::new().unwrap();
        assert_eq!(manifest("{}", temp.path()).subject(), "");
        assert_eq!(manifest("subject: s", temp.path()).subject(), "s");
    }
}
