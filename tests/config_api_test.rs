//! Integration tests for config module public API.

use passflow::config::{load_merged_config, validate, Manifest, PassflowConfig};
use passflow::registry::Discovery;
use passflow::runner::{FailurePolicy, Pipeline};
use passflow::unit::{ExecutionContext, Phase};
use std::fs;
use tempfile::TempDir;

fn project(config: &str, local: Option<&str>) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".passflow");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), config).unwrap();
    if let Some(local) = local {
        fs::write(dir.join("config.local.yml"), local).unwrap();
    }
    temp
}

#[test]
fn public_api_is_accessible() {
    let config = PassflowConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn config_merge_workflow() {
    let temp = project(
        r#"
subject: base
settings:
  failure_policy: abort
  env:
    MODE: debug
units:
  - id: compile
"#,
        Some("subject: local\nsettings:\n  failure_policy: continue\n"),
    );

    let config = load_merged_config(temp.path()).unwrap();
    validate(&config).unwrap();

    assert_eq!(config.subject.as_deref(), Some("local"));
    assert_eq!(config.settings.failure_policy, FailurePolicy::ContinueOnError);
    assert_eq!(config.settings.env.get("MODE").map(String::as_str), Some("debug"));
    assert_eq!(config.units.len(), 1);
}

#[test]
fn manifest_discovers_units_and_steps() {
    let temp = project(
        r#"
units:
  - id: setup
    phase: setup
jobs:
  - id: assets
    steps:
      - name: generate
      - name: pack
        phase: optimize
"#,
        None,
    );

    let manifest = Manifest::load(temp.path(), None).unwrap();
    let units = manifest.discover().unwrap();
    let summary: Vec<_> = units.iter().map(|u| (u.id(), u.phase())).collect();
    assert_eq!(
        summary,
        vec![
            ("setup", Phase::Setup),
            ("assets.generate", Phase::Build),
            ("assets.pack", Phase::Optimize),
        ]
    );
}

#[test]
fn manifest_pipeline_runs_commands() {
    let temp = project(
        r#"
units:
  - id: second
    after: [first]
    command: echo second >> out.txt
  - id: first
    command: echo first >> out.txt
"#,
        None,
    );

    let manifest = Manifest::load(temp.path(), None).unwrap();
    let report = Pipeline::new(manifest)
        .run(&mut ExecutionContext::new("s"))
        .unwrap();

    assert!(report.success);
    let out = fs::read_to_string(temp.path().join("out.txt")).unwrap();
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["first", "second"]);
}

#[test]
fn invalid_manifest_is_rejected_on_load() {
    let temp = project("units:\n  - id: a\n    after: [b]\n    before: [b]\n", None);
    let err = Manifest::load(temp.path(), None).unwrap_err();
    assert!(err.to_string().contains("both after and before"));
}
