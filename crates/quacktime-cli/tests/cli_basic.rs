//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_quacktime"))
        .args(args)
        .env("QUACKTIME_HOME", home.path())
        .env_remove("QUACKTIME_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &TempDir, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Every JSON document printed to stdout, in order.
fn json_docs(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("stdout is not a JSON stream")
}

#[test]
fn test_status_when_idle() {
    let home = TempDir::new().unwrap();
    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["type"], "StateSnapshot");
    assert_eq!(docs[0]["state"], "idle");
    assert_eq!(docs[0]["elapsed_focus_secs"], 0);
}

#[test]
fn test_start_break_stop_saves_activity() {
    let home = TempDir::new().unwrap();

    let docs = json_docs(&run_ok(&home, &["timer", "start", "--name", "Study"]));
    assert_eq!(docs[0]["type"], "SessionStarted");

    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["state"], "running");

    let docs = json_docs(&run_ok(&home, &["timer", "break"]));
    assert_eq!(docs[0]["type"], "BreakStarted");
    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["state"], "onBreak");

    let docs = json_docs(&run_ok(
        &home,
        &["timer", "stop", "--name", "Study", "--emoji", "📚"],
    ));
    assert_eq!(docs[0]["type"], "SessionStopped");
    assert_eq!(docs[1]["type"], "ActivitySaved");
    assert_eq!(docs[1]["name"], "Study");
    // Far too short for a streak day.
    assert_eq!(docs.len(), 2);

    let docs = json_docs(&run_ok(&home, &["activity", "list", "--json"]));
    let list = docs[0].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["emoji"], "📚");

    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["state"], "idle");

    let docs = json_docs(&run_ok(&home, &["stats", "today"]));
    assert_eq!(docs[0]["total_sessions"], 1);

    let docs = json_docs(&run_ok(&home, &["streak", "show"]));
    assert_eq!(docs[0]["current"], 0);
}

#[test]
fn test_stop_discard_saves_nothing() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["timer", "start"]);
    let docs = json_docs(&run_ok(&home, &["timer", "stop", "--discard"]));
    assert_eq!(docs[1]["type"], "SessionDiscarded");

    let docs = json_docs(&run_ok(&home, &["activity", "list", "--json"]));
    assert!(docs[0].as_array().unwrap().is_empty());
}

#[test]
fn test_activity_show_and_delete() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["timer", "start"]);
    let docs = json_docs(&run_ok(&home, &["timer", "stop", "--name", "Read"]));
    let id = docs[1]["id"].as_str().unwrap().to_string();

    let docs = json_docs(&run_ok(&home, &["activity", "show", &id]));
    assert_eq!(docs[0]["name"], "Read");

    let out = run_ok(&home, &["activity", "list"]);
    assert!(out.contains("Read"));

    run_ok(&home, &["activity", "delete", &id]);
    let (_, stderr, code) = run_cli(&home, &["activity", "show", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("activity not found"));
}

#[test]
fn test_reset_requires_confirmation() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["timer", "start"]);

    let (_, stderr, code) = run_cli(&home, &["timer", "reset"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--yes"));

    let docs = json_docs(&run_ok(&home, &["timer", "reset", "--yes"]));
    assert_eq!(docs[0]["type"], "SessionReset");
    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["state"], "idle");
}

#[test]
fn test_rejected_transitions_fail() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["timer", "break"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("cannot toggle a break while idle"));

    let (_, _, code) = run_cli(&home, &["timer", "stop"]);
    assert_eq!(code, 1);

    run_ok(&home, &["timer", "start"]);
    let (_, stderr, code) = run_cli(&home, &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("cannot start while running"));
}

#[test]
fn test_streak_message() {
    let home = TempDir::new().unwrap();
    let docs = json_docs(&run_ok(&home, &["streak", "message", "3"]));
    assert!(docs[0]["sub_header"].as_str().unwrap().contains("3 day streak"));
}

#[test]
fn test_config_set_get_reset() {
    let home = TempDir::new().unwrap();
    assert_eq!(
        run_ok(&home, &["config", "get", "session.default_name"]).trim(),
        "Focus Session"
    );

    run_ok(&home, &["config", "set", "session.default_name", "Deep Work"]);
    assert_eq!(
        run_ok(&home, &["config", "get", "session.default_name"]).trim(),
        "Deep Work"
    );

    let (_, _, code) = run_cli(&home, &["config", "set", "calendar.utc_offset_minutes", "5000"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(&home, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    run_ok(&home, &["config", "reset"]);
    assert_eq!(
        run_ok(&home, &["config", "get", "session.default_name"]).trim(),
        "Focus Session"
    );
}

#[test]
fn test_default_name_applies_on_stop() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["config", "set", "session.default_name", "Deep Work"]);
    run_ok(&home, &["timer", "start"]);
    let docs = json_docs(&run_ok(&home, &["timer", "stop"]));
    assert_eq!(docs[1]["name"], "Deep Work");
}

#[test]
fn test_stop_keeps_label_from_start() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["timer", "start", "--name", "Study", "--emoji", "📚"]);
    let docs = json_docs(&run_ok(&home, &["timer", "stop"]));
    assert_eq!(docs[1]["type"], "ActivitySaved");
    assert_eq!(docs[1]["name"], "Study");
    assert_eq!(docs[1]["emoji"], "📚");

    // An explicit name at stop still wins.
    run_ok(&home, &["timer", "start", "--name", "Study"]);
    let docs = json_docs(&run_ok(&home, &["timer", "stop", "--name", "Reading"]));
    assert_eq!(docs[1]["name"], "Reading");
}

#[test]
fn test_watch_exits_when_stopped_elsewhere() {
    let home = TempDir::new().unwrap();
    run_ok(&home, &["timer", "start", "--name", "Study"]);

    let mut watcher = Command::new(env!("CARGO_BIN_EXE_quacktime"))
        .args(["timer", "watch"])
        .env("QUACKTIME_HOME", home.path())
        .env_remove("QUACKTIME_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn watch");

    sleep(Duration::from_millis(1500));
    let docs = json_docs(&run_ok(&home, &["timer", "stop"]));
    assert_eq!(docs[1]["name"], "Study");

    // Give the watcher a few ticks to notice.
    sleep(Duration::from_millis(2500));
    let exited = watcher.try_wait().unwrap();
    if exited.is_none() {
        watcher.kill().ok();
        watcher.wait().ok();
    }

    let docs = json_docs(&run_ok(&home, &["timer", "status"]));
    assert_eq!(docs[0]["state"], "idle");
    let docs = json_docs(&run_ok(&home, &["activity", "list", "--json"]));
    assert_eq!(docs[0].as_array().unwrap().len(), 1);
    assert!(exited.is_some(), "watch kept running after an external stop");
}

#[test]
fn test_unusable_data_dir_is_reported() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_quacktime"))
        .args(["timer", "status"])
        .env("QUACKTIME_HOME", &file)
        .env_remove("QUACKTIME_LOG")
        .output()
        .expect("Failed to execute CLI command");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("data directory"), "{stderr}");
}

#[test]
fn test_todo_items_and_groups() {
    let home = TempDir::new().unwrap();

    let groups = run_ok(&home, &["todo", "group", "list"]);
    assert!(groups.contains("My Tasks"));
    run_ok(&home, &["todo", "group", "add", "Work", "--color", "blue"]);

    let out = run_ok(&home, &["todo", "add", "Write report", "--group", "work", "--due", "2099-01-01"]);
    let report = out.trim().trim_start_matches("Added: ").to_string();
    run_ok(&home, &["todo", "add", "Buy milk"]);

    let docs = json_docs(&run_ok(&home, &["todo", "list", "--json"]));
    let items = docs[0].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Buy milk");
    assert_eq!(items[1]["id"], report.as_str());
    assert!(items[1]["dueDate"].is_string());

    run_ok(&home, &["todo", "done", &report]);
    let docs = json_docs(&run_ok(&home, &["todo", "list", "--pending", "--json"]));
    assert_eq!(docs[0].as_array().unwrap().len(), 1);
    let docs = json_docs(&run_ok(&home, &["todo", "list", "--today", "--json"]));
    assert!(docs[0].as_array().unwrap().is_empty());

    // Deleting a group takes its items with it.
    run_ok(&home, &["todo", "group", "delete", "Work"]);
    let docs = json_docs(&run_ok(&home, &["todo", "list", "--json"]));
    assert_eq!(docs[0].as_array().unwrap().len(), 1);

    let (_, stderr, code) = run_cli(&home, &["todo", "group", "delete", "My Tasks"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("last group"), "{stderr}");

    let (_, _, code) = run_cli(&home, &["todo", "add", "   "]);
    assert_eq!(code, 1);
}
