use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_eval_with_bindings() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("eval")
        .arg("{cities} * 2 + {settlements}")
        .arg("cities=3")
        .arg("settlements=4");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("= 10"));
}

#[test]
fn test_cli_eval_raw() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("eval").arg("max({a}, 1) / 2").arg("a=5").arg("--raw");

    cmd.assert().success().stdout("2.5\n");
}

#[test]
fn test_cli_eval_bad_binding() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("eval").arg("{a}").arg("a");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected name=value"));
}

#[test]
fn test_cli_eval_runtime_error() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("eval").arg("{a} / 0");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Division by zero"));
}

#[test]
fn test_cli_formula_length_limit() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("eval")
        .arg("1 + 2 + 3 + 4")
        .arg("--max-formula-length")
        .arg("5");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("max_formula_length"));
}

#[test]
fn test_cli_validate() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("validate").arg("if(owns({road}), 2, 0)");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Formula is valid"));

    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("validate").arg("sqrt({a})");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown function 'sqrt'"));
}

#[test]
fn test_cli_refs() {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("refs").arg("{b} + {a} * {b}");

    cmd.assert().success().stdout("a\nb\n");
}
