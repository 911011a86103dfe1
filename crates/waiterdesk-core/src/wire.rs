//! Serde helpers for the backend's loosely typed JSON.
//!
//! The REST backend is not consistent about scalar types: table numbers arrive
//! as strings or numbers, timestamps as ISO strings or epoch milliseconds, and
//! references either as bare ids or as populated documents. These helpers
//! accept every observed shape and nothing else, so a genuinely malformed
//! payload still fails to decode.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// A scalar that may be sent as a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl StringOrNumber {
    pub fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Integer(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

/// A timestamp as sent on the wire, parsed lazily so a bad value can be
/// reported with the field it came from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
}

impl WireTimestamp {
    /// Convert into a UTC instant, naming `field` in the error.
    pub fn parse(&self, field: &str) -> Result<DateTime<Utc>> {
        match self {
            WireTimestamp::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| Error::schema(format!("{field}: {ms} is out of range"))),
            WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::schema(format!("{field}: '{text}' is not a timestamp ({e})"))),
        }
    }
}

/// A reference to another document: either its id or the populated document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DocumentRef {
    Id(String),
    Populated(PopulatedDocument),
}

/// A populated reference, reduced to what the client displays.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDocument")]
pub struct PopulatedDocument {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(flatten)]
    ids: DocumentIds,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    number: Option<String>,
}

impl TryFrom<RawDocument> for PopulatedDocument {
    type Error = String;

    fn try_from(raw: RawDocument) -> std::result::Result<Self, String> {
        Ok(Self {
            id: raw.ids.require()?,
            name: first_present([raw.name, raw.number]),
        })
    }
}

impl DocumentRef {
    pub fn id(&self) -> &str {
        match self {
            DocumentRef::Id(id) => id,
            DocumentRef::Populated(doc) => &doc.id,
        }
    }

    /// Display name of a populated reference.
    pub fn name(&self) -> Option<String> {
        match self {
            DocumentRef::Id(_) => None,
            DocumentRef::Populated(doc) => doc.name.clone(),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, DocumentRef::Populated(_))
    }

    /// Pick between two keys naming the same reference. A populated document
    /// wins over a bare id; otherwise `primary` wins.
    pub fn prefer(primary: Option<DocumentRef>, secondary: Option<DocumentRef>) -> Option<DocumentRef> {
        match (primary, secondary) {
            (Some(p), Some(s)) if !p.is_populated() && s.is_populated() => Some(s),
            (p, s) => p.or(s),
        }
    }
}

/// The MongoDB `_id` and the virtual `id`; documents may carry either or both.
///
/// Meant to be `#[serde(flatten)]`ed into an intermediate wire struct.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentIds {
    #[serde(default, rename = "_id", deserialize_with = "opt_string_or_number")]
    pub mongo_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
}

impl DocumentIds {
    /// `_id` over `id`.
    pub fn resolve(self) -> Option<String> {
        first_present([self.mongo_id, self.id])
    }

    pub fn require(self) -> std::result::Result<String, String> {
        self.resolve().ok_or_else(|| missing("_id"))
    }
}

/// The first alternative key the payload actually carried, in precedence
/// order.
pub fn first_present<T, const N: usize>(candidates: [Option<T>; N]) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// Error text for a mandatory key absent under every accepted name.
pub fn missing(field: &str) -> String {
    format!("missing field `{field}`")
}

/// Deserialize an optional string that may also arrive as a number.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}
