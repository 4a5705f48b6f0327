//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory,
//! with desktop notifications and audio players switched off.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        sandbox.success(&["config", "set", "notifications.desktop", "false"]);
        sandbox.success(&["config", "set", "sound.players", "[]"]);
        sandbox
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_eyerest"));
        cmd.env("EYEREST_DATA_DIR", self.path()).env_remove("RUST_LOG");
        cmd
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> Value {
        let stdout = self.success(args);
        serde_json::from_str(stdout.trim()).expect("Failed to parse JSON output")
    }
}

#[test]
fn test_fresh_install_is_running() {
    let sb = Sandbox::new();
    let status = sb.json(&["status", "--json"]);

    assert_eq!(status["running"], true);
    assert!(status["nextTriggerAt"].as_u64().is_some());
    assert_eq!(status["breakActiveUntil"], Value::Null);
    assert_eq!(status["settings"]["intervalMinutes"], 10);
    assert_eq!(status["settings"]["breakSeconds"], 20);
    assert_eq!(status["settings"]["soundEnabled"], true);
    assert_eq!(status["settings"]["notificationsEnabled"], true);
    assert!(sb.path().join("eyerest.db").exists());
    assert!(sb.path().join("config.toml").exists());
}

#[test]
fn test_status_human_output() {
    let sb = Sandbox::new();
    let stdout = sb.success(&["status"]);
    assert!(stdout.starts_with("Running: next reminder in"), "{stdout}");
}

#[test]
fn test_toggle_persists_across_processes() {
    let sb = Sandbox::new();
    let toggled = sb.json(&["toggle", "--json"]);
    assert_eq!(toggled["running"], false);
    assert_eq!(toggled["nextTriggerAt"], Value::Null);

    let status = sb.json(&["status", "--json"]);
    assert_eq!(status["running"], false);

    let resumed = sb.json(&["toggle", "--json"]);
    assert_eq!(resumed["running"], true);
    assert!(resumed["nextTriggerAt"].as_u64().is_some());
}

#[test]
fn test_reminder_while_paused() {
    let sb = Sandbox::new();
    sb.success(&["toggle"]);

    let ack = sb.json(&["test"]);
    assert_eq!(ack["success"], true);

    let status = sb.json(&["status", "--json"]);
    assert_eq!(status["running"], false);
    assert_eq!(status["nextTriggerAt"], Value::Null);
    assert!(status["breakActiveUntil"].as_u64().is_some());
}

#[test]
fn test_settings_set_and_show() {
    let sb = Sandbox::new();
    let updated = sb.json(&["settings", "set", "--interval", "25", "--sound", "off"]);
    assert_eq!(updated["intervalMinutes"], 25);
    assert_eq!(updated["soundEnabled"], false);
    assert_eq!(updated["breakSeconds"], 20);

    let shown = sb.json(&["settings", "show"]);
    assert_eq!(shown, updated);

    let status = sb.json(&["status", "--json"]);
    assert_eq!(status["settings"]["intervalMinutes"], 25);
}

#[test]
fn test_settings_out_of_range_rejected() {
    let sb = Sandbox::new();
    let (_, stderr, code) = sb.run(&["settings", "set", "--interval", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Interval must be between 1 and 120 minutes."), "{stderr}");

    let (_, stderr, code) = sb.run(&["settings", "set", "--break", "121"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Break must be between 5 and 120 seconds."), "{stderr}");

    let shown = sb.json(&["settings", "show"]);
    assert_eq!(shown["intervalMinutes"], 10);
}

#[test]
fn test_config_get_set() {
    let sb = Sandbox::new();
    assert_eq!(sb.success(&["config", "get", "alarm.poll_secs"]).trim(), "30");
    sb.success(&["config", "set", "alarm.poll_secs", "5"]);
    assert_eq!(sb.success(&["config", "get", "alarm.poll_secs"]).trim(), "5");

    let (_, stderr, code) = sb.run(&["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));

    let (_, _, code) = sb.run(&["config", "set", "alarm.poll_secs", "soon"]);
    assert_eq!(code, 1);

    sb.success(&["config", "reset"]);
    assert_eq!(sb.success(&["config", "get", "alarm.poll_secs"]).trim(), "30");
}

#[test]
fn test_daemon_serves_stdin_until_eof() {
    let sb = Sandbox::new();
    let mut child = sb
        .command()
        .args(["daemon", "--poll-secs", "1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"id":1,"action":"getStatus"}}"#).unwrap();
        writeln!(stdin, r#"{{"id":2,"action":"bogus"}}"#).unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let lines: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(lines
        .iter()
        .any(|v| v["type"] == "Reconciled" && v["outcome"] == "repaired"));
    let status = lines.iter().find(|v| v["id"] == 1).unwrap();
    assert_eq!(status["running"], true);
    let failure = lines.iter().find(|v| v["id"] == 2).unwrap();
    assert_eq!(failure["success"], false);
}
