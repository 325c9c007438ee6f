//! Raw event records as returned by the incident API
//!
//! The API is producer-controlled, so nothing about a record's shape is
//! trusted. [`RawRecord`] keeps the decoded JSON untouched and offers
//! coercing accessors; the one polymorphic field (`location`) is resolved
//! here into [`LocationField`] so the normalizer never inspects JSON types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ID_KEY: &str = "id";
pub const NAME_KEY: &str = "name";
pub const TYPE_KEY: &str = "type";
pub const LOCATION_KEY: &str = "location";
pub const DATETIME_KEY: &str = "datetime";

/// Accepted keys for the free-text description, in priority order
pub const DESCRIPTION_KEYS: &[&str] = &["summary", "description"];

const LOCATION_NAME_KEY: &str = "name";
const LOCATION_GPS_KEY: &str = "gps";

/// One untyped record from the fetched batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Value);

/// The `location` field, resolved once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum LocationField {
    /// Missing or `null`
    Absent,
    /// A bare place name with no coordinate sub-field
    Plain(String),
    /// An object carrying a name and a combined `"lat, lon"` string
    Structured {
        name: Option<String>,
        gps: Option<String>,
        raw: Value,
    },
}

impl RawRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A field of an object record, ignoring explicit `null`s
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// String-coerced field, empty when absent
    pub fn text(&self, key: &str) -> String {
        self.field(key).map(coerce_text).unwrap_or_default()
    }

    /// String-coerced value of the first alias present
    pub fn text_any(&self, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|key| self.field(key))
            .map(coerce_text)
            .unwrap_or_default()
    }

    pub fn id(&self) -> String {
        self.text(ID_KEY)
    }

    pub fn location(&self) -> LocationField {
        match self.field(LOCATION_KEY) {
            None => LocationField::Absent,
            Some(Value::Object(map)) => LocationField::Structured {
                name: map
                    .get(LOCATION_NAME_KEY)
                    .filter(|v| !v.is_null())
                    .map(coerce_text),
                gps: map
                    .get(LOCATION_GPS_KEY)
                    .filter(|v| !v.is_null())
                    .map(coerce_text),
                raw: Value::Object(map.clone()),
            },
            Some(other) => LocationField::Plain(coerce_text(other)),
        }
    }

    /// Compact JSON of the whole record, kept for audit and replay
    pub fn to_payload(&self) -> String {
        self.0.to_string()
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Strings pass through verbatim; anything else renders as JSON
fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
