//! CLI tests for switchpush
//!
//! These tests drive the binary with assert_cmd. Every invocation points at
//! an explicit config file and inventory directory so nothing from the
//! developer's environment leaks in, and every `run` is a dry run so no
//! device is contacted.

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn switchpush_cmd() -> Command {
    let mut cmd = Command::cargo_bin("switchpush").unwrap();
    for var in [
        "SWITCHPUSH_CONFIG",
        "SWITCHPUSH_NUM_WORKERS",
        "SWITCHPUSH_DRY_RUN",
        "SWITCHPUSH_INVENTORY",
        "SWITCHPUSH_LOG_FILE",
        "SWITCHPUSH_LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

fn config_file(body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{}", body).unwrap();
    file
}

fn default_config() -> NamedTempFile {
    config_file("[logging]\nlevel = \"error\"\n")
}

#[test]
fn test_help() {
    switchpush_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("inventory"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_version() {
    switchpush_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    switchpush_cmd().arg("deploy").assert().failure();
}

#[test]
fn test_inventory_list_json() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    let output = switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["--output", "json", "inventory"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let hosts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = hosts
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h["name"].as_str())
        .collect();
    assert_eq!(names, vec!["leaf01", "leaf02", "spine01"]);
    assert_eq!(hosts[0]["platform"], "nxos");
}

#[test]
fn test_inventory_host_detail() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["inventory", "--host", "spine01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("role: spine"))
        .stdout(predicate::str::contains("datacenter"));
}

#[test]
fn test_inventory_limit_without_matches_fails() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["inventory", "-l", "border*"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("no hosts matched"));
}

#[test]
fn test_dry_run_push_prints_tree() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* leaf01 ** changed : false"))
        .stdout(predicate::str::contains("* leaf02 ** changed : false"))
        .stdout(predicate::str::contains("spine01").not())
        .stdout(predicate::str::contains("interface Ethernet1/13"))
        .stdout(predicate::str::contains("(dry run)"));
}

#[test]
fn test_dry_run_minimal_with_limit() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["--output", "minimal", "run", "--dry-run", "-l", "leaf02"])
        .assert()
        .success()
        .stdout(predicate::eq("leaf02 | OK\n"));
}

#[test]
fn test_custom_plan_from_config() {
    let fixture = InventoryFixture::standard();
    let config = config_file(
        r#"
[runner]
dry_run = true

[logging]
level = "error"

[[push]]
name = "eos_uplinks"
group = "arista_eos"
commands = ["interface Ethernet49/1", "no shutdown"]
"#,
    );

    let output = switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["--output", "json", "run", "--plan", "eos_uplinks"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["hosts"], 1);
    let push = &report["run"]["results"]["spine01"]["children"][1];
    assert_eq!(push["name"], "push_config");
    assert_eq!(push["value"][0], "interface Ethernet49/1");
}

#[test]
fn test_unknown_plan_is_config_error() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["run", "--plan", "does_not_exist"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("does_not_exist"));
}

#[test]
fn test_missing_inventory_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(dir.path())
        .args(["run", "--dry-run"])
        .assert()
        .code(5);
}

#[test]
fn test_check_config_ok() {
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("num_workers = 30"))
        .stdout(predicate::str::contains("Configuration OK"));
}

#[test]
fn test_check_config_rejects_bad_file() {
    let config = config_file("[runner]\nnum_workers = \"many\"\n");

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["check-config"])
        .assert()
        .code(4);
}

#[test]
fn test_check_config_rejects_zero_workers() {
    let config = config_file("[runner]\nnum_workers = 0\n");

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .args(["check-config", "--quiet"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("num_workers"));
}

#[test]
fn test_check_config_resolves_inventory() {
    let fixture = InventoryFixture::standard();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(fixture.dir.path())
        .args(["-v", "check-config", "--quiet", "--resolve-inventory"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nxos_ports: leaf01, leaf02"))
        .stdout(predicate::str::contains("num_workers").not());
}

#[test]
fn test_check_config_missing_inventory_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = default_config();

    switchpush_cmd()
        .arg("-c")
        .arg(config.path())
        .arg("-i")
        .arg(dir.path())
        .args(["check-config", "-q", "--resolve-inventory"])
        .assert()
        .code(5);
}
