//! CLI tests for the `ralph` binary.
//!
//! Spawns the binary against a temporary project and checks stdout, exit
//! codes, and the persisted state file.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use ralph::exit_codes;
use ralph::io::state_store::StateStore;
use ralph::test_support::TestProject;

fn ralph(project: &TestProject, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ralph"))
        .arg("--project")
        .arg(project.root())
        .args(args)
        .output()
        .expect("run ralph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn status_without_loop_exits_inactive() {
    let project = TestProject::new().expect("project");
    let out = ralph(&project, &["status"]);
    assert_eq!(out.status.code(), Some(exit_codes::INACTIVE));
    assert!(stdout(&out).contains("\"active\": false"));
}

#[test]
fn start_status_cancel_round_trip() {
    let project = TestProject::new().expect("project");

    let out = ralph(
        &project,
        &["start", "fix the build", "--completion-promise", "DONE", "--max-iterations", "4"],
    );
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(stdout(&out).contains("Ralph Loop STARTED."));
    assert!(stdout(&out).contains("Max Iterations: 4"));

    let out = ralph(&project, &["status"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(stdout(&out).contains("\"prompt\": \"fix the build\""));

    let out = ralph(&project, &["cancel"]);
    assert_eq!(stdout(&out).trim(), "Ralph Loop CANCELLED.");
    let out = ralph(&project, &["cancel"]);
    assert_eq!(stdout(&out).trim(), "No active Ralph Loop to cancel.");
}

#[test]
fn idle_with_signal_stops_loop() {
    let project = TestProject::new().expect("project");
    project.write_agent_command(&["true"]).expect("config");
    ralph(&project, &["start", "fix", "--completion-promise", "DONE"]);

    let out = ralph(&project, &["idle", "--output", "work is DONE"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(stdout(&out).starts_with("complete 0/10"));
    assert!(!project.store().load().active);
}

#[test]
fn idle_without_signal_advances_and_launches() {
    let project = TestProject::new().expect("project");
    project.write_agent_command(&["true"]).expect("config");
    ralph(&project, &["start", "fix", "--max-iterations", "2"]);

    let out = ralph(&project, &["idle"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&out).trim(), "continue 1/2 launched");
    assert_eq!(project.store().load().iteration_count, 1);
}

#[test]
fn missing_agent_program_keeps_loop_armed() {
    let project = TestProject::new().expect("project");
    project
        .write_agent_command(&["ralph-test-no-such-agent-91c2"])
        .expect("config");
    ralph(&project, &["start", "fix"]);

    let out = ralph(&project, &["idle"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&out).trim(), "continue 1/10");
    let state = project.store().load();
    assert!(state.active);
    assert_eq!(state.iteration_count, 1);
}

#[test]
fn invalid_config_is_reported() {
    let project = TestProject::new().expect("project");
    let config_path = project.paths().config_path;
    std::fs::create_dir_all(config_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&config_path, "default_max_iterations = 0\n").expect("write");

    let out = ralph(&project, &["status"]);
    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&out.stderr).contains("default_max_iterations"));
}

#[test]
fn session_speaks_json_lines() {
    let project = TestProject::new().expect("project");
    project.write_agent_command(&["true"]).expect("config");

    let mut child = Command::new(env!("CARGO_BIN_EXE_ralph"))
        .arg("--project")
        .arg(project.root())
        .arg("session")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn session");

    let input = [
        r#"{"type":"tool.call","id":"1","name":"ralph_start","arguments":{"prompt":"fix","max_iterations":1}}"#,
        r#"{"type":"session.idle"}"#,
        r#"{"type":"session.idle"}"#,
        "garbage",
        r#"{"type":"tool.call","id":"2","name":"ralph_cancel"}"#,
    ]
    .join("\n");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write events");

    let out = child.wait_with_output().expect("wait session");
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let lines: Vec<serde_json::Value> = stdout(&out)
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], "1");
    assert_eq!(lines[1]["output"], "No active Ralph Loop to cancel.");

    let state = project.store().load();
    assert!(!state.active);
    assert_eq!(state.iteration_count, 1);
}

#[test]
fn tools_lists_definitions() {
    let project = TestProject::new().expect("project");
    let out = ralph(&project, &["tools"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let defs: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(defs[0]["name"], "ralph_start");
    assert_eq!(defs[1]["name"], "ralph_cancel");
}
