use crate::{write_state, GAME};
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_check_clean() {
    let (_dir, path) = write_state(GAME);

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("check").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn test_cli_check_reports_issues() {
    let (_dir, path) = write_state(
        r#"{
            "sessions": [{"id": "s1", "playerIds": ["alice"]}],
            "categories": [
                {"id": "a", "sessionId": "s1", "name": "Broken", "displayType": "formula",
                 "formula": "{x} + (1"},
                {"id": "b", "sessionId": "s1", "name": "Orphan", "parentCategoryId": "ghost"}
            ]
        }"#,
    );

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("check").arg(&path);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("[s1] category 'Broken': invalid formula"))
        .stdout(predicate::str::contains("parent category 'ghost' not found"))
        .stderr(predicate::str::contains("2 issue(s) found"));
}
