//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway config and timetable.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const TIMETABLE: &str = r#"[
    {"time": "08:00", "task": "Wake"},
    {"time": "09:00", "task": "Work", "duration": "4h", "notes": "finish the report"},
    {"time": "noon", "task": "Broken"},
    {"time": "22:00", "task": "Sleep"}
]"#;

struct Sandbox {
    _dir: tempfile::TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        Self::with_timetable(TIMETABLE)
    }

    fn with_timetable(json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let timetable = dir.path().join("timetable.json");
        std::fs::write(&timetable, json).unwrap();

        let sandbox = Self { _dir: dir, config };
        let (_, _, code) = sandbox.run(&["config", "set", "timetable_file", path_str(&timetable)]);
        assert_eq!(code, 0);
        sandbox
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_timecue"));
        cmd.arg("--config")
            .arg(&self.config)
            .args(args)
            .env("TIMECUE_LOG", "warn")
            .env_remove("OPENROUTER_API_KEY");
        cmd
    }

    /// Run the CLI and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command(args)
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);

        (stdout, stderr, code)
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_config_set_then_get() {
    let sandbox = Sandbox::new();
    assert!(sandbox.config.exists());

    let (stdout, _, code) = sandbox.run(&["config", "set", "notifications.minutes_before_task", "20"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = sandbox.run(&["config", "get", "notifications.minutes_before_task"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "20");
}

#[test]
fn test_config_rejects_bad_values() {
    let sandbox = Sandbox::new();

    let (_, stderr, code) = sandbox.run(&["config", "set", "timezone", "Mars/Olympus"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));

    let (_, _, code) = sandbox.run(&["config", "get", "no.such.key"]);
    assert_ne!(code, 0);

    let (stdout, _, _) = sandbox.run(&["config", "get", "timezone"]);
    assert_eq!(stdout.trim(), "Asia/Kolkata");
}

#[test]
fn test_config_list_is_json() {
    let sandbox = Sandbox::new();
    let (stdout, _, code) = sandbox.run(&["config", "list"]);
    assert_eq!(code, 0);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["notifications"]["notification_interval_seconds"], 1800);
    assert_eq!(parsed["llm"]["retries"], 3);
}

#[test]
fn test_timetable_list_sorted_and_skips_bad_rows() {
    let sandbox = Sandbox::new();
    let (stdout, _, code) = sandbox.run(&["timetable", "list"]);
    assert_eq!(code, 0);

    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("08:00  Wake"));
    assert!(lines[1].starts_with("09:00  Work"));
    assert!(lines[2].starts_with("22:00  Sleep"));
}

#[test]
fn test_timetable_list_json() {
    let sandbox = Sandbox::new();
    let (stdout, _, code) = sandbox.run(&["timetable", "list", "--json"]);
    assert_eq!(code, 0);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["entries"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["entries"][1]["duration_minutes"], 240);
    assert_eq!(parsed["skipped"][0]["task"], "Broken");
}

#[test]
fn test_status_at_resolves_active_and_upcoming() {
    let sandbox = Sandbox::new();
    let (stdout, _, code) = sandbox.run(&["status", "--at", "08:50"]);
    assert_eq!(code, 0);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timezone"], "Asia/Kolkata");
    assert_eq!(parsed["active"]["task"], "Wake");
    assert_eq!(parsed["upcoming"]["task"], "Work");
    assert_eq!(parsed["minutes_until_upcoming"], 10);
    assert_eq!(parsed["upcoming_just_started"], false);
}

#[test]
fn test_status_rejects_bad_time() {
    let sandbox = Sandbox::new();
    let (_, stderr, code) = sandbox.run(&["status", "--at", "quarter past"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid --at"));
}

#[test]
fn test_missing_timetable_is_an_error() {
    let sandbox = Sandbox::new();
    let (_, _, code) = sandbox.run(&["config", "set", "timetable_file", "/definitely/not/here.json"]);
    assert_eq!(code, 0);

    let (_, stderr, code) = sandbox.run(&["timetable", "list"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_run_refuses_empty_timetable() {
    let sandbox = Sandbox::with_timetable("[]");
    let (stdout, stderr, code) = sandbox.run(&["run"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no usable entries"));
    assert!(!stdout.contains("App started"));
}

#[test]
fn test_run_quits_while_stdin_stays_open() {
    let sandbox = Sandbox::new();
    let mut child = sandbox
        .command(&["run"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start timecue run");

    // Hold the pipe open so only the quit command can end the session.
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "quit").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("timecue run did not exit after quit");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    drop(stdin);

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert!(status.success());
    assert!(stdout.contains("[timecue] App started! Testing notifications."));
    assert!(stdout.contains("stopped"));
}
