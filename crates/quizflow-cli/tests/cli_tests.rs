//! CLI integration tests using assert_cmd.
//!
//! Interactive sessions run against the built-in local backend with scripted
//! stdin, so no network is involved.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quizflow() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("quizflow").unwrap()
}

#[test]
fn help_output() {
    quizflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Adaptive-learning quiz sessions in the terminal",
        ));
}

#[test]
fn version_output() {
    quizflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizflow"));
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    quizflow()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizflow.toml"));

    assert!(dir.path().join("quizflow.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    quizflow()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // Second init should skip
    quizflow()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn topics_lists_builtin_subjects() {
    let dir = TempDir::new().unwrap();

    quizflow()
        .current_dir(dir.path())
        .arg("topics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Physics"))
        .stdout(predicate::str::contains("Mathematics"))
        .stdout(predicate::str::contains("Chemistry"));
}

#[test]
fn topics_with_unknown_backend() {
    let dir = TempDir::new().unwrap();

    quizflow()
        .current_dir(dir.path())
        .arg("topics")
        .arg("--backend")
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not configured"));
}

#[test]
fn run_unknown_subject() {
    let dir = TempDir::new().unwrap();

    quizflow()
        .current_dir(dir.path())
        .arg("run")
        .arg("--subject")
        .arg("biology")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to start a session for 'biology'",
        ));
}

#[test]
fn run_subject_without_cards() {
    let dir = TempDir::new().unwrap();

    // Chemistry has no concepts in the built-in catalog.
    quizflow()
        .current_dir(dir.path())
        .arg("run")
        .arg("--subject")
        .arg("chemistry")
        .assert()
        .success()
        .stdout(predicate::str::contains("No flashcards found"));
}

#[test]
fn run_plays_a_full_session() {
    let dir = TempDir::new().unwrap();
    let config = write_fast_config(&dir);

    // Rate every concept 3, answer every question with option a (all of the
    // built-in answer keys are a). Mathematics has three concepts.
    quizflow()
        .current_dir(dir.path())
        .arg("run")
        .arg("--subject")
        .arg("mathematics")
        .arg("--config")
        .arg(&config)
        .write_stdin("3\na\n3\na\n3\na\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pythagorean Theorem"))
        .stdout(predicate::str::contains("Correct!"))
        .stdout(predicate::str::contains("Session complete. Score: 3/3"))
        .stdout(predicate::str::contains("Score: 3/3"));
}

#[test]
fn run_rejects_invalid_input_then_recovers() {
    let dir = TempDir::new().unwrap();
    let config = write_fast_config(&dir);

    // "9" is out of the rating range, "z" is not an option id. Quit after
    // the first question resolves.
    quizflow()
        .current_dir(dir.path())
        .arg("run")
        .arg("--subject")
        .arg("physics")
        .arg("--config")
        .arg(&config)
        .write_stdin("9\n3\nz\na\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter a rating from 1 to 5."))
        .stdout(predicate::str::contains("Pick one of the listed options."))
        .stdout(predicate::str::contains("Correct answer: a"));
}

#[test]
fn run_quits_on_request() {
    let dir = TempDir::new().unwrap();

    quizflow()
        .current_dir(dir.path())
        .arg("run")
        .arg("--subject")
        .arg("physics")
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mass-Energy Equivalence"))
        .stdout(predicate::str::contains("Session complete").not());
}

/// Write a config that shrinks the feedback pauses so sessions finish fast.
fn write_fast_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("fast.toml");
    std::fs::write(
        &path,
        r#"
default_backend = "local"
feedback_dwell_ms = 10
timeout_dwell_ms = 10

[backends.local]
type = "local"
"#,
    )
    .unwrap();
    path
}
