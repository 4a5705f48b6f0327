//! Request dispatcher and JSON-lines wire codec.

mod common;

use common::{Harness, MINUTE_MS, T0};
use eyerest_core::storage::database::lock;
use eyerest_core::{Request, RequestDispatcher, Response, Settings, REMINDER_ALARM};
use serde_json::{json, Value};

fn dispatcher(h: &Harness) -> RequestDispatcher {
    RequestDispatcher::new(h.engine.clone())
}

fn parse(line: &str) -> Value {
    serde_json::from_str(line).unwrap()
}

#[tokio::test]
async fn get_status_after_fresh_install() {
    let h = Harness::new();
    h.engine.reconcile().await.unwrap();
    let d = dispatcher(&h);

    let response = d.dispatch(Request::GetStatus).await.unwrap();

    let Response::Status(status) = response else {
        panic!("expected status, got {response:?}");
    };
    assert!(status.running);
    assert_eq!(status.next_trigger_at, Some(T0 + 10 * MINUTE_MS));
    assert_eq!(status.settings, Settings::default());
}

#[tokio::test]
async fn toggle_running_returns_fresh_status() {
    let h = Harness::new();
    h.engine.reconcile().await.unwrap();
    let d = dispatcher(&h);

    let response = d.dispatch(Request::ToggleRunning).await.unwrap();

    let Response::Status(status) = response else {
        panic!("expected status, got {response:?}");
    };
    assert!(!status.running);
    assert_eq!(status.next_trigger_at, None);
    assert!(h.alarms.period(REMINDER_ALARM).is_none());
}

#[tokio::test]
async fn test_and_update_acknowledge() {
    let h = Harness::new();
    let d = dispatcher(&h);

    assert_eq!(d.dispatch(Request::TestReminder).await.unwrap(), Response::ack());
    let settings = Settings {
        interval_minutes: 25,
        ..Settings::default()
    };
    assert_eq!(
        d.dispatch(Request::UpdateSettings { settings }).await.unwrap(),
        Response::ack()
    );
    assert_eq!(h.engine.status().await.unwrap().settings.interval_minutes, 25);
}

#[tokio::test]
async fn wire_reply_echoes_id() {
    let h = Harness::new();
    h.engine.reconcile().await.unwrap();
    let d = dispatcher(&h);

    let reply = parse(&d.handle_line(r#"{"id":7,"action":"getStatus"}"#).await);

    assert_eq!(reply["id"], 7);
    assert_eq!(reply["running"], true);
    assert_eq!(reply["nextTriggerAt"], T0 + 10 * MINUTE_MS);
    assert_eq!(reply["breakActiveUntil"], Value::Null);
    assert_eq!(reply["settings"]["breakSeconds"], 20);
}

#[tokio::test]
async fn wire_reply_without_id() {
    let h = Harness::new();
    let d = dispatcher(&h);

    let reply = parse(&d.handle_line(r#"{"action":"testReminder"}"#).await);

    assert_eq!(reply, json!({ "success": true }));
}

#[tokio::test]
async fn wire_update_settings() {
    let h = Harness::new();
    h.engine.reconcile().await.unwrap();
    let d = dispatcher(&h);

    let line = json!({
        "id": "abc",
        "action": "updateSettings",
        "settings": {
            "intervalMinutes": 25,
            "breakSeconds": 30,
            "soundEnabled": false,
            "notificationsEnabled": true
        }
    })
    .to_string();
    let reply = parse(&d.handle_line(&line).await);

    assert_eq!(reply, json!({ "id": "abc", "success": true }));
    let status = h.engine.status().await.unwrap();
    assert_eq!(status.next_trigger_at, Some(T0 + 25 * MINUTE_MS));
    assert!(!status.settings.sound_enabled);
}

#[tokio::test]
async fn malformed_lines_fail_without_dispatching() {
    let h = Harness::new();
    let d = dispatcher(&h);

    let reply = parse(&d.handle_line("not json").await);
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().contains("JSON"));

    let reply = parse(&d.handle_line(r#"{"id":3,"action":"selfDestruct"}"#).await);
    assert_eq!(reply["id"], 3);
    assert_eq!(reply["success"], false);

    assert_eq!(h.alarms.calls(), (0, 0, 0));
}

#[tokio::test]
async fn persistence_failure_is_reported() {
    let h = Harness::new();
    lock(&h.db).unwrap().conn().execute_batch("DROP TABLE kv").unwrap();
    let d = dispatcher(&h);

    assert!(d.dispatch(Request::GetStatus).await.is_err());

    let reply = parse(&d.handle_line(r#"{"id":1,"action":"toggleRunning"}"#).await);
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().contains("Database"));
}
