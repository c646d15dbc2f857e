//! Integration tests for the passflow binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".passflow");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), config).unwrap();
    temp
}

fn passflow(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("passflow"));
    cmd.current_dir(temp.path()).env_remove("PASSFLOW_CONFIG");
    cmd
}

const PIPELINE: &str = r#"
subject: scenes/Main
units:
  - id: pack
    phase: optimize
    command: echo pack >> log.txt
  - id: compile
    after: [setup]
    command: echo "compile $PASSFLOW_SUBJECT" >> log.txt
  - id: setup
    phase: setup
    command: echo setup >> log.txt
jobs:
  - id: assets
    steps:
      - name: generate
        command: echo assets.generate >> log.txt
        before_jobs: [lighting]
  - id: lighting
    steps:
      - name: bake
        command: echo lighting.bake >> log.txt
"#;

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("passflow"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("build passes"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("passflow"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn run_executes_in_phase_and_dependency_order() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE);
    passflow(&temp)
        .args(["run", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 units ran"));

    let log = fs::read_to_string(temp.path().join("log.txt"))?;
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            "setup",
            "compile scenes/Main",
            "assets.generate",
            "lighting.bake",
            "pack"
        ]
    );
    Ok(())
}

#[test]
fn no_args_runs_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("units:\n  - id: only\n    command: echo ran > log.txt\n");
    passflow(&temp).assert().success();
    assert!(temp.path().join("log.txt").exists());
    Ok(())
}

#[test]
fn plan_lists_units_without_running() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE);
    passflow(&temp)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. setup"))
        .stdout(predicate::str::contains("5. pack"));

    assert!(!temp.path().join("log.txt").exists());
    Ok(())
}

#[test]
fn plan_json_is_parseable() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE);
    let output = passflow(&temp)
        .args(["plan", "--json", "--filter", "^(assets|lighting)\\."])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let order = &value["phases"][0]["order"];
    assert_eq!(order[0], "assets.generate");
    assert_eq!(order[1], "lighting.bake");
    Ok(())
}

#[test]
fn check_reports_cycle_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("units:\n  - id: a\n    after: [b]\n  - id: b\n    after: [a]\n");
    passflow(&temp)
        .args(["check", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("a -> b -> a"));
    Ok(())
}

#[test]
fn check_passes_clean_manifest() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE);
    passflow(&temp)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
    Ok(())
}

#[test]
fn failing_unit_exits_with_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("units:\n  - id: broken\n    command: exit 5\n");
    passflow(&temp)
        .args(["run", "--quiet"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken"));
    Ok(())
}

#[test]
fn missing_manifest_exits_with_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    passflow(&temp)
        .args(["--project", temp.path().to_str().unwrap(), "plan"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No manifest found"));
    Ok(())
}

#[test]
fn explicit_config_path_is_used() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(PIPELINE);
    let other = temp.path().join("other.yml");
    fs::write(&other, "units:\n  - id: elsewhere\n")?;

    passflow(&temp)
        .args(["plan", "--config", other.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. elsewhere"))
        .stdout(predicate::str::contains("setup").not());
    Ok(())
}
