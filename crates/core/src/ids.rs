use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CoreError;
use crate::field_value::FieldValue;

/// Stable row key. Compares by its normalized form (trimmed, lowercased) but
/// keeps the original spelling for storage and display.
#[derive(Clone)]
pub struct RowId {
    raw: String,
    key: String,
}

impl RowId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = normalize(&raw);
        Self { raw, key }
    }

    /// Reads an identifier out of a cell. Numeric ids are common in sheets and
    /// are keyed by their decimal rendering. Blank cells have no identifier.
    pub fn from_value(value: &FieldValue) -> Option<Self> {
        if value.is_blank() {
            return None;
        }
        match value {
            FieldValue::Text(s) => Some(Self::new(s.clone())),
            FieldValue::Integer(n) => Some(Self::new(n.to_string())),
            FieldValue::Float(x) if x.fract() == 0.0 => Some(Self::new(format!("{x:.0}"))),
            other => Some(Self::new(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.raw.clone())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl PartialEq for RowId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RowId {}

impl Hash for RowId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Ord for RowId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for RowId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for RowId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.raw)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Handle of the person saving edits, as supplied by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditorId(String);

impl EditorId {
    pub fn new(handle: impl Into<String>) -> Result<Self, CoreError> {
        let handle = handle.into();
        let trimmed = handle.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidData("editor handle is blank".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EditorId({})", self.0)
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", &self.0.to_string()[..8])
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
