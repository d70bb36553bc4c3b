use crate::{write_state, GAME};
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_score_table() {
    let (_dir, path) = write_state(GAME);

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("score").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Settlements"))
        .stdout(predicate::str::contains("Cities"))
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("Winner: alice"));
}

#[test]
fn test_cli_score_json() {
    let (_dir, path) = write_state(GAME);

    let output = Command::cargo_bin("tally")
        .unwrap()
        .arg("score")
        .arg(&path)
        .arg("--session")
        .arg("s1")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["winners"][0], "alice");
    assert_eq!(json["standings"][1]["playerId"], "bob");
    assert_eq!(json["standings"][1]["total"], 4.0);
}

#[test]
fn test_cli_score_unknown_session() {
    let (_dir, path) = write_state(GAME);

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("score").arg(&path).arg("--session").arg("s9");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Session 's9' not found"));
}

#[test]
fn test_cli_score_missing_file() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("score").arg("does-not-exist.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read"));
}

#[test]
fn test_cli_score_invalid_json() {
    let (_dir, path) = write_state("{\"sessions\": 1}");

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("score").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid state JSON"));
}
