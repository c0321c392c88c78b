use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_serve_and_health() {
    Command::cargo_bin("recall-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn health_against_missing_socket_fails_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("nonexistent.sock");

    Command::cargo_bin("recall-cli")
        .unwrap()
        .args(["--socket-path", socket_path.to_str().unwrap(), "health"])
        .assert()
        .failure();
}
