use crate::{write_state, GAME};
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_cycle_fires_rule() {
    let (_dir, path) = write_state(GAME);

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("cycle").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Triggered by entry e2 for alice"))
        .stdout(predicate::str::contains("Rule: Ten club"))
        .stdout(predicate::str::contains("+5"));
}

#[test]
fn test_cli_cycle_json() {
    let (_dir, path) = write_state(GAME);

    let output = Command::cargo_bin("tally")
        .unwrap()
        .arg("cycle")
        .arg(&path)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["triggerEntryId"], "e2");
    assert_eq!(json["entries"][0]["source"], "ruleEngine");
    assert_eq!(json["suppressed"], 0);
    assert_eq!(json["impactEntries"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_cli_cycle_without_entries() {
    let (_dir, path) = write_state(r#"{"sessions": [{"id": "s1"}]}"#);

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("cycle").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No manual entry to evaluate"));
}
