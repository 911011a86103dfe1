//! Realtime event names and payloads for the waiter-call room

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::CallStatus;
use crate::waiter_call::WaiterCallRecord;
use crate::wire::{self, DocumentIds};

/// Server → client: a customer created a call.
pub const NEW_WAITER_CALL: &str = "new_waiter_call";

/// Server → client: a call changed status.
pub const WAITER_CALL_STATUS_UPDATED: &str = "waiter_call_status_updated";

/// Client → server: subscribe this socket to a restaurant's broadcasts.
pub const JOIN_RESTAURANT_ROOM: &str = "joinRestaurantRoom";

/// Payload of [`WAITER_CALL_STATUS_UPDATED`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStatusUpdate")]
pub struct StatusUpdate {
    pub call_id: String,
    pub status: CallStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatusUpdate {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    call_id: Option<String>,
    #[serde(flatten)]
    ids: DocumentIds,
    status: CallStatus,
}

impl TryFrom<RawStatusUpdate> for StatusUpdate {
    type Error = String;

    fn try_from(raw: RawStatusUpdate) -> std::result::Result<Self, String> {
        let call_id = match raw.call_id {
            Some(id) => id,
            None => raw.ids.resolve().ok_or_else(|| wire::missing("callId"))?,
        };
        Ok(Self {
            call_id,
            status: raw.status,
        })
    }
}

/// A decoded waiter-call room event.
#[derive(Debug, Clone)]
pub enum CallEvent {
    NewCall(WaiterCallRecord),
    StatusUpdated(StatusUpdate),
}

impl CallEvent {
    /// Decode the payload of a named event.
    ///
    /// Returns `Ok(None)` for events this module does not own and a
    /// [`Error::Schema`] when a known event carries a malformed payload.
    pub fn decode(event: &str, payload: &Value) -> Result<Option<CallEvent>> {
        match event {
            NEW_WAITER_CALL => serde_json::from_value(payload.clone())
                .map(|record| Some(CallEvent::NewCall(record)))
                .map_err(|e| Error::schema(format!("{NEW_WAITER_CALL}: {e}"))),
            WAITER_CALL_STATUS_UPDATED => serde_json::from_value(payload.clone())
                .map(|update| Some(CallEvent::StatusUpdated(update)))
                .map_err(|e| Error::schema(format!("{WAITER_CALL_STATUS_UPDATED}: {e}"))),
            _ => Ok(None),
        }
    }

    pub fn call_id(&self) -> &str {
        match self {
            CallEvent::NewCall(record) => &record.call_id,
            CallEvent::StatusUpdated(update) => &update.call_id,
        }
    }
}

/// Payload of the room-join emission.
pub fn join_room_payload(restaurant_id: &str) -> Value {
    Value::String(restaurant_id.to_string())
}
