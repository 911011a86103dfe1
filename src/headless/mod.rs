//! Headless mode - NDJSON event output for the call board
//!
//! `waiterdesk watch` prints one JSON object per line to stdout. Each object
//! has an "event" field naming its type plus event-specific data. Logs go to
//! the log file, never to stdout.
//!
//! # Example Output
//!
//! ```json
//! {"event":"snapshot","restaurant_id":"r1","calls":[],"timestamp":1714593600000}
//! {"event":"call_added","call":{"callId":"c1","status":"pending",...},"timestamp":1714593601000}
//! {"event":"call_status_changed","call_id":"c1","from":"pending","to":"acknowledged","timestamp":1714593602000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use waiterdesk_app::CallList;
use waiterdesk_client::ConnectionState;
use waiterdesk_core::{CallStatus, WaiterCall};

pub use runner::{run_headless, watch_calls, WatchCommand};

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Full list after a (re)load
    Snapshot {
        restaurant_id: String,
        calls: Vec<WaiterCall>,
        timestamp: i64,
    },

    /// A call appeared
    CallAdded { call: WaiterCall, timestamp: i64 },

    CallStatusChanged {
        call_id: String,
        from: CallStatus,
        to: CallStatus,
        timestamp: i64,
    },

    /// A call is gone after a reload
    CallRemoved { call_id: String, timestamp: i64 },

    Connection {
        state: String,
        attempt: Option<u32>,
        timestamp: i64,
    },

    /// A command from stdin went through
    CommandSucceeded {
        command: String,
        call_id: Option<String>,
        timestamp: i64,
    },

    /// The stored session was cleared (401 or logout elsewhere)
    SessionCleared { timestamp: i64 },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // NDJSON: one object per line, flushed immediately
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn snapshot(restaurant_id: &str, calls: &CallList) -> Self {
        Self::Snapshot {
            restaurant_id: restaurant_id.to_string(),
            calls: calls.as_slice().to_vec(),
            timestamp: Self::now(),
        }
    }

    pub fn call_added(call: &WaiterCall) -> Self {
        Self::CallAdded {
            call: call.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn call_status_changed(call_id: &str, from: CallStatus, to: CallStatus) -> Self {
        Self::CallStatusChanged {
            call_id: call_id.to_string(),
            from,
            to,
            timestamp: Self::now(),
        }
    }

    pub fn call_removed(call_id: &str) -> Self {
        Self::CallRemoved {
            call_id: call_id.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn connection(state: &ConnectionState) -> Self {
        let (name, attempt) = match state {
            ConnectionState::Disconnected => ("disconnected", None),
            ConnectionState::Connecting => ("connecting", None),
            ConnectionState::Connected => ("connected", None),
            ConnectionState::Reconnecting { attempt } => ("reconnecting", Some(*attempt)),
        };
        Self::Connection {
            state: name.to_string(),
            attempt,
            timestamp: Self::now(),
        }
    }

    pub fn command_succeeded(command: &str, call_id: Option<&str>) -> Self {
        Self::CommandSucceeded {
            command: command.to_string(),
            call_id: call_id.map(str::to_string),
            timestamp: Self::now(),
        }
    }

    pub fn session_cleared() -> Self {
        Self::SessionCleared {
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Event name as serialized in the "event" field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::CallAdded { .. } => "call_added",
            Self::CallStatusChanged { .. } => "call_status_changed",
            Self::CallRemoved { .. } => "call_removed",
            Self::Connection { .. } => "connection",
            Self::CommandSucceeded { .. } => "command_succeeded",
            Self::SessionCleared { .. } => "session_cleared",
            Self::Error { .. } => "error",
        }
    }
}

/// Events that turn `previous` into `current`.
///
/// Additions come out oldest first, so replaying them in order reproduces the
/// list's newest-first ordering.
pub fn diff_calls(previous: &CallList, current: &CallList) -> Vec<HeadlessEvent> {
    let mut events = Vec::new();

    for call in current.iter().rev() {
        match previous.get(&call.call_id) {
            None => events.push(HeadlessEvent::call_added(call)),
            Some(before) if before.status != call.status => events.push(
                HeadlessEvent::call_status_changed(&call.call_id, before.status, call.status),
            ),
            Some(_) => {}
        }
    }

    for call in previous.iter() {
        if !current.contains(&call.call_id) {
            events.push(HeadlessEvent::call_removed(&call.call_id));
        }
    }

    events
}
