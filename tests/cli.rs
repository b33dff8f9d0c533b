//! Command line behavior of the `expectrun` binary.

mod common;

use std::process::{Command, Output};

use common::{verdict, Project};
use pretty_assertions::assert_eq;

fn expectrun(project: &Project, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_expectrun"))
        .args(args)
        .current_dir(project.root())
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn expectrun")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_exit_code_reflects_failures() {
    let project = Project::new();
    project.case("ok.c", &[], &["echo ok"]);
    project.write("cases/ok.c.expect", "ok\n");

    let output = expectrun(&project, &[]);
    assert_eq!(output.status.code(), Some(0));

    project.write("cases/ok.c.expect", "not ok\n");
    let output = expectrun(&project, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(verdict(&stdout(&output), "cases/ok.c"), Some("FAIL (Output)"));
}

#[test]
fn test_store_flag_records() {
    let project = Project::new();
    project.case("r.c", &[], &["echo recorded"]);

    let output = expectrun(&project, &["--store"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(project.read("cases/r.c.expect"), "recorded\n");

    let output = expectrun(&project, &["--test"]);
    assert_eq!(verdict(&stdout(&output), "cases/r.c"), Some("OK"));
}

#[test]
fn test_run_flag_prints() {
    let project = Project::new();
    project.case("p.c", &[], &["echo printed"]);

    let output = expectrun(&project, &["--run"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("printed\n"));
    assert!(!project.path("cases/p.c.expect").exists());
}

#[test]
fn test_action_flags_are_exclusive() {
    let project = Project::new();
    let output = expectrun(&project, &["--run", "--store"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_list_prints_discovered_paths() {
    let project = Project::new();
    project.case("b.c", &[], &[]);
    project.case("a.s", &[], &[]);
    project.write("cases/readme.txt", "");

    let output = expectrun(&project, &["--list"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "cases/a.s\ncases/b.c\n");
}

#[test]
fn test_explicit_targets() {
    let project = Project::new();
    project.case("one.c", &[], &["echo 1"]);
    project.case("two.c", &[], &["echo 2"]);
    project.write("cases/one.c.expect", "1\n");

    let output = expectrun(&project, &["cases/one.c"]);
    let text = stdout(&output);
    assert_eq!(verdict(&text, "cases/one.c"), Some("OK"));
    assert_eq!(verdict(&text, "cases/two.c"), None);
}

#[test]
fn test_config_file_moves_cases_dir() {
    let project = Project::new();
    project.write("expectrun.toml", "cases_dir = \"suite\"\nname_width = 20\n");
    project.write(
        "suite/x.c",
        &format!("{}\n#> #!/bin/sh\n#> echo x\n", common::STAND_IN_COMPILE),
    );
    project.write("suite/x.c.expect", "x\n");

    let output = expectrun(&project, &[]);
    assert_eq!(stdout(&output).lines().next(), Some("suite/x.c:          OK"));
}

#[test]
fn test_missing_cases_dir_is_an_error() {
    let project = Project::new();
    std::fs::remove_dir(project.path("cases")).unwrap();

    let output = expectrun(&project, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to enumerate"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let project = Project::new();
    let output = expectrun(&project, &["--config", "absent.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.toml"));
}

#[test]
fn test_failed_cases_log_nothing_by_default() {
    let project = Project::new();
    project.case("nobuild.c", &["compile = exit 1"], &[]);
    project.case("crash.c", &[], &["exit 3"]);

    let output = expectrun(&project, &[]);
    let text = stdout(&output);
    assert_eq!(verdict(&text, "cases/nobuild.c"), Some("FAIL (Compile)"));
    assert_eq!(verdict(&text, "cases/crash.c"), Some("FAIL (Exit Code 3)"));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "");
}

#[test]
fn test_log_output_is_plain_when_piped() {
    let project = Project::new();
    project.case("ok.c", &[], &["echo ok"]);

    let output = Command::new(env!("CARGO_BIN_EXE_expectrun"))
        .arg("-v")
        .current_dir(project.root())
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn expectrun");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Executing"));
    assert!(!stderr.contains('\u{1b}'));
}
