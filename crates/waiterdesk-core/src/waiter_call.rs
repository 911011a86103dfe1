//! Waiter calls: the wire record and its normalized form
//!
//! [`WaiterCallRecord`] is what the REST list endpoint and the
//! `new_waiter_call` event carry. [`WaiterCall`] is the shape the rest of the
//! client works with; [`WaiterCallRecord::normalize`] is the single place the
//! two are reconciled.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::CallStatus;
use crate::wire::{self, DocumentIds, DocumentRef, WireTimestamp};

/// A customer-initiated request for staff attention, tied to a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterCall {
    pub call_id: String,
    pub restaurant_id: String,
    pub table_id: String,
    pub table_name: String,
    pub customer_name: String,
    pub message: String,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl WaiterCall {
    /// Creation time in the device's local zone, as shown on the call board.
    pub fn created_label(&self) -> String {
        format_local(self.created_at)
    }

    /// Minutes elapsed between creation and `now`, clamped at zero.
    pub fn waiting_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes().max(0)
    }

    /// Table label for display; falls back to the id when no name was sent.
    pub fn table_label(&self) -> &str {
        if self.table_name.is_empty() {
            &self.table_id
        } else {
            &self.table_name
        }
    }
}

/// Format an instant as `dd/mm/yyyy HH:MM` in local time.
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// A waiter call exactly as the backend sends it.
///
/// Only the identity is mandatory; event payloads are frequently partial.
/// Keys the backend spells several ways are resolved by [`RawWaiterCall`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawWaiterCall")]
pub struct WaiterCallRecord {
    pub call_id: String,
    pub restaurant_id: Option<DocumentRef>,
    pub table_id: Option<DocumentRef>,
    pub table_name: Option<String>,
    pub customer_name: Option<String>,
    pub message: Option<String>,
    pub status: Option<CallStatus>,
    pub created_at: Option<WireTimestamp>,
    pub acknowledged_at: Option<WireTimestamp>,
    pub resolved_at: Option<WireTimestamp>,
}

/// Every spelling the backend uses, each kept as its own key so a payload
/// carrying several of them still decodes.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWaiterCall {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    call_id: Option<String>,
    #[serde(flatten)]
    ids: DocumentIds,
    #[serde(default)]
    restaurant_id: Option<DocumentRef>,
    #[serde(default)]
    restaurant: Option<DocumentRef>,
    #[serde(default)]
    table_id: Option<DocumentRef>,
    #[serde(default)]
    table: Option<DocumentRef>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    table_name: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    table_number: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<CallStatus>,
    #[serde(default)]
    created_at: Option<WireTimestamp>,
    #[serde(default)]
    acknowledged_at: Option<WireTimestamp>,
    #[serde(default)]
    resolved_at: Option<WireTimestamp>,
}

impl TryFrom<RawWaiterCall> for WaiterCallRecord {
    type Error = String;

    fn try_from(raw: RawWaiterCall) -> std::result::Result<Self, String> {
        let call_id = match raw.call_id {
            Some(id) => id,
            None => raw.ids.resolve().ok_or_else(|| wire::missing("callId"))?,
        };
        Ok(Self {
            call_id,
            restaurant_id: DocumentRef::prefer(raw.restaurant_id, raw.restaurant),
            table_id: DocumentRef::prefer(raw.table_id, raw.table),
            table_name: wire::first_present([raw.table_name, raw.table_number]),
            customer_name: raw.customer_name,
            message: raw.message,
            status: raw.status,
            created_at: raw.created_at,
            acknowledged_at: raw.acknowledged_at,
            resolved_at: raw.resolved_at,
        })
    }
}

impl WaiterCallRecord {
    /// Restaurant this record belongs to, when the payload says so.
    pub fn restaurant(&self) -> Option<&str> {
        self.restaurant_id.as_ref().map(DocumentRef::id)
    }

    /// Convert into a [`WaiterCall`].
    ///
    /// `received_at` stands in for a missing `createdAt`. A timestamp that is
    /// present but unparseable is a schema error rather than a silent default.
    pub fn normalize(self, received_at: DateTime<Utc>) -> Result<WaiterCall> {
        let created_at = match &self.created_at {
            Some(ts) => ts.parse("createdAt")?,
            None => received_at,
        };
        let acknowledged_at = self
            .acknowledged_at
            .as_ref()
            .map(|ts| ts.parse("acknowledgedAt"))
            .transpose()?;
        let resolved_at = self
            .resolved_at
            .as_ref()
            .map(|ts| ts.parse("resolvedAt"))
            .transpose()?;

        let (table_id, populated_name) = match &self.table_id {
            Some(table) => (table.id().to_string(), table.name()),
            None => (String::new(), None),
        };
        let table_name = self.table_name.or(populated_name).unwrap_or_default();

        Ok(WaiterCall {
            restaurant_id: self.restaurant_id.map(|r| r.id().to_string()).unwrap_or_default(),
            call_id: self.call_id,
            table_id,
            table_name,
            customer_name: self.customer_name.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_at,
            acknowledged_at,
            resolved_at,
        })
    }
}
