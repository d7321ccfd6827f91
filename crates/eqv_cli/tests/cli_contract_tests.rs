//! CLI contract tests: subcommands, output formats and exit status.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Runs `eqv` inside an empty directory so no stray config file is picked up.
#[allow(deprecated)]
fn cli(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("eqv").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("Failed to run CLI");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    serde_json::from_str(&stdout).expect("Invalid JSON output")
}

#[test]
fn test_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("mc"))
        .stdout(predicate::str::contains("check-json"))
        .stdout(predicate::str::contains("recognized"));
}

#[test]
fn test_check_text_output() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .args(["check", "(x+1)^2", "x^2+2x+1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("correct (confidence 0.70)"))
        .stdout(predicate::str::contains("Answer correct via algebraic comparison"));
}

#[test]
fn test_incorrect_answer_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .args(["check", "3x", "y=2x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("incorrect"))
        .stdout(predicate::str::contains("Expected y=2x, got 3x"));
}

#[test]
fn test_check_json_format() {
    let dir = tempfile::tempdir().unwrap();
    let json = json_output(cli(&dir).args(["check", "2x", "y=2x", "--format", "json"]));
    assert_eq!(json["is_correct"], true);
    assert_eq!(json["confidence"], 0.95);
    assert_eq!(json["strategy"], "rhs_equiv");
    assert_eq!(json["error_message"], Value::Null);
}

#[test]
fn test_multiple_choice() {
    let dir = tempfile::tempdir().unwrap();
    let json = json_output(cli(&dir).args(["mc", "1", "2", "--format", "json"]));
    assert_eq!(json["is_correct"], false);
    assert_eq!(json["explanation"], "Incorrect. Correct option was 3.");

    let json = json_output(cli(&dir).args(["mc", "0", "first", "--format", "json"]));
    assert_eq!(json["explanation"], "Invalid correct_answer format");
    assert_eq!(json["error_message"], "Invalid correct_answer format");
}

#[test]
fn test_check_json_from_argument_and_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let json = json_output(cli(&dir).args([
        "check-json",
        r#"{"user_answer": "0.5", "correct_answer": "\\frac{1}{2}"}"#,
    ]));
    assert_eq!(json["is_correct"], true);
    assert_eq!(json["confidence"], 0.9);

    let json = json_output(
        cli(&dir)
            .arg("check-json")
            .write_stdin(r#"{"user_answer": "", "correct_answer": "1", "question_type": "multiple_choice"}"#),
    );
    assert_eq!(json["explanation"], "No option selected");
}

#[test]
fn test_check_json_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let json = json_output(cli(&dir).args(["check-json", "{\"user_answer\": 3}"]));
    assert_eq!(json["is_correct"], false);
    assert_eq!(json["explanation"], "Validation error");
    assert!(json["error_message"].is_string());
}

#[test]
fn test_recognized() {
    let dir = tempfile::tempdir().unwrap();
    let json = json_output(cli(&dir).args(["recognized", "\\(x^2\\)", "x^2", "--format", "json"]));
    assert_eq!(json["is_correct"], true);
    assert_eq!(json["recognized_latex"], "x^2");

    let json = json_output(cli(&dir).args(["recognized", "$ $", "x", "--format", "json"]));
    assert_eq!(
        json["explanation"],
        "Could not recognize any math expressions in the image"
    );
    assert_eq!(json["recognized_latex"], "");
}

#[test]
fn test_config_file_changes_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("eqv_config.toml"),
        "[engine]\nnumeric_tolerance = 0.001\n",
    )
    .unwrap();
    let json = json_output(cli(&dir).args(["check", "3.1416", "\\pi", "--format", "json"]));
    assert_eq!(json["strategy"], "numeric");
}

#[test]
fn test_config_restore_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir).args(["config", "restore"]).assert().success();
    let content = std::fs::read_to_string(dir.path().join("eqv_config.toml")).unwrap();
    assert!(content.contains("[engine]"));
    assert!(content.contains("max_terms = 200"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir)
        .args(["--verbose", "check", "x+1", "1+x", "--format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("strategy evaluated"));
}
