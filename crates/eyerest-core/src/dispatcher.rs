//! Request/response boundary in front of the engine.
//!
//! Callers (the CLI, the daemon's stdin channel) send named actions and get a
//! status payload or an acknowledgement back. Each `dispatch` resolves only
//! after the engine has persisted its transition.
//!
//! ## Wire format
//!
//! One JSON object per line:
//!
//! ```text
//! -> {"id": 1, "action": "toggleRunning"}
//! <- {"id": 1, "running": false, "settings": {...}, "nextTriggerAt": null, "breakActiveUntil": null}
//! -> {"action": "updateSettings", "settings": {"intervalMinutes": 25, ...}}
//! <- {"success": true}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::engine::{ReminderEngine, Status};
use crate::error::Result;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetStatus,
    ToggleRunning,
    TestReminder,
    UpdateSettings { settings: Settings },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetStatus => "getStatus",
            Request::ToggleRunning => "toggleRunning",
            Request::TestReminder => "testReminder",
            Request::UpdateSettings { .. } => "updateSettings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status(Status),
    Ack { success: bool },
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack { success: true }
    }
}

/// A wire request: an optional correlation id plus the request itself.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(flatten)]
    request: Request,
}

#[derive(Clone)]
pub struct RequestDispatcher {
    engine: Arc<ReminderEngine>,
}

impl RequestDispatcher {
    pub fn new(engine: Arc<ReminderEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ReminderEngine> {
        &self.engine
    }

    /// Run one request to completion.
    ///
    /// # Errors
    /// Propagates persistence failures from the engine unchanged.
    #[tracing::instrument(skip(self, request), fields(action = request.name()))]
    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        debug!("dispatching request");
        match request {
            Request::GetStatus => Ok(Response::Status(self.engine.status().await?)),
            Request::ToggleRunning => Ok(Response::Status(self.engine.toggle().await?)),
            Request::TestReminder => {
                self.engine.test_trigger().await?;
                Ok(Response::ack())
            }
            Request::UpdateSettings { settings } => {
                self.engine.update_settings(settings).await?;
                Ok(Response::ack())
            }
        }
    }

    /// Decode one wire line, dispatch it and encode the reply.
    ///
    /// Never fails: malformed input and engine errors come back as
    /// `{"success": false, "error": ...}` with the request id echoed.
    pub async fn handle_line(&self, line: &str) -> String {
        let (id, outcome) = match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => (envelope.id, self.dispatch(envelope.request).await),
            Err(e) => {
                // Recover the id if the line was at least a JSON object.
                let id = serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|v| v.get("id").cloned());
                warn!(error = %e, "malformed request");
                (id, Err(e.into()))
            }
        };

        let mut reply = match outcome {
            Ok(response) => serde_json::to_value(&response)
                .unwrap_or_else(|e| failure(&e.to_string())),
            Err(e) => {
                warn!(error = %e, "request failed");
                failure(&e.to_string())
            }
        };
        if let (Some(id), Some(obj)) = (id, reply.as_object_mut()) {
            obj.insert("id".into(), id);
        }
        reply.to_string()
    }
}

fn failure(message: &str) -> Value {
    json!({ "success": false, "error": message })
}
