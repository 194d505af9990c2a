//! Command-line tests that do not need the engine library.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tessmark(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tessmark").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    tessmark(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recognize"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_recognize_missing_input() {
    let home = TempDir::new().unwrap();
    tessmark(&home)
        .args(["recognize", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_without_matches() {
    let home = TempDir::new().unwrap();
    let pattern = home.path().join("*.png");
    tessmark(&home)
        .args(["batch", pattern.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_config_path_under_config_home() {
    let home = TempDir::new().unwrap();
    tessmark(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tessmark"))
        .stdout(predicate::str::contains("config.json"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_config_init_set_get() {
    let home = TempDir::new().unwrap();

    tessmark(&home).args(["config", "init"]).assert().success();
    assert!(home.path().join("tessmark").join("config.json").exists());

    tessmark(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tessmark(&home)
        .args(["config", "set", "recognition.minimum_confidence", "75"])
        .assert()
        .success();

    tessmark(&home)
        .args(["config", "get", "recognition.minimum_confidence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("75"));
}

#[test]
fn test_config_set_rejects_invalid_thickness() {
    let home = TempDir::new().unwrap();
    tessmark(&home)
        .args(["config", "set", "recognition.line_thickness", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line_thickness"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    tessmark(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"minimum_confidence\": 60"))
        .stdout(predicate::str::contains("\"language\": \"eng\""));
}
