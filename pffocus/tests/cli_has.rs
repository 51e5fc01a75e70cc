use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn has_reports_each_path() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pffocus"));
    cmd.arg("has")
        .arg(fixture("fixtures/pfsense-sample.xml"))
        .arg("vlans.vlan")
        .arg("interfaces.opt1.mtu")
        .arg("installedpackages")
        .arg("system.user.name")
        .assert()
        .success()
        .stdout(predicate::str::contains("vlans.vlan=true\n"))
        .stdout(predicate::str::contains("interfaces.opt1.mtu=true\n"))
        .stdout(predicate::str::contains("installedpackages=false\n"))
        .stdout(predicate::str::contains("system.user.name=false\n"));
}

#[test]
fn has_requires_a_path() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pffocus"));
    cmd.arg("has")
        .arg(fixture("fixtures/pfsense-sample.xml"))
        .assert()
        .failure();
}

#[test]
fn has_fails_on_empty_input() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("empty.xml");
    std::fs::write(&path, "").expect("write xml");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pffocus"));
    cmd.arg("has")
        .arg(&path)
        .arg("filter")
        .assert()
        .failure()
        .stderr(predicate::str::contains("document contains no elements"));
}
