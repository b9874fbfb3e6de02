//! Keyset cursor for paging through inbox rows.
//!
//! Lists are ordered newest first on `(date_added, id)`. A cursor encodes the
//! position of the last item seen, and the next page selects rows strictly
//! before that position. Keyset paging stays consistent while the cleanup job
//! deletes rows underneath the reader, which offset paging does not.
//!
//! # Timestamp precision
//!
//! Cursors carry timestamps as milliseconds. Rows written with finer
//! precision would never compare equal to a decoded cursor (SQLite compares
//! the stored TEXT form), so writers truncate `date_added` with
//! [`truncate_to_millis`] before inserting.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("invalid cursor format")]
    InvalidFormat,
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("invalid UUID in cursor")]
    InvalidUuid,
}

/// A position in the `(date_added, id)` ordering.
///
/// The id breaks ties between rows that share a timestamp, so the ordering
/// is total and a page boundary never skips or repeats rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub date_added: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(date_added: DateTime<Utc>, id: Uuid) -> Self {
        Self { date_added, id }
    }

    /// Encode as URL-safe base64 of `{timestamp_millis}:{uuid}`.
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.date_added.timestamp_millis(), self.id);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::InvalidFormat)?;

        // UUIDs use hyphens, not colons, so ':' cleanly separates the parts.
        let (timestamp_str, uuid_str) = raw.split_once(':').ok_or(CursorError::InvalidFormat)?;

        let timestamp_millis: i64 = timestamp_str
            .parse()
            .map_err(|_| CursorError::InvalidTimestamp)?;

        let date_added = DateTime::from_timestamp_millis(timestamp_millis)
            .ok_or(CursorError::InvalidTimestamp)?;

        let id = Uuid::parse_str(uuid_str).map_err(|_| CursorError::InvalidUuid)?;

        Ok(Self { date_added, id })
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl Serialize for Cursor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cursor::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Truncate a DateTime to millisecond precision.
///
/// Writers must apply this to `date_added` before inserting rows that will
/// be paged by cursor; see the module docs.
pub fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}
