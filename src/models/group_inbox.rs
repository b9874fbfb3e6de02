use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a group landed in the review inbox.
///
/// Stored as a small integer. The discriminants are part of the schema and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum InboxReason {
    /// The group was seen for the first time.
    New = 0,
    /// The group was un-ignored, manually or by an expiring snooze.
    Unignored = 1,
    /// A resolved group started erroring again.
    Regression = 2,
    /// A user moved the group back into the inbox.
    Manual = 3,
    /// Events were reprocessed and the group changed.
    Reprocessed = 4,
}

impl InboxReason {
    /// Decode the stored small-int form. Returns None for unknown values.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(InboxReason::New),
            1 => Some(InboxReason::Unignored),
            2 => Some(InboxReason::Regression),
            3 => Some(InboxReason::Manual),
            4 => Some(InboxReason::Reprocessed),
            _ => None,
        }
    }
}

impl std::fmt::Display for InboxReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InboxReason::New => write!(f, "new"),
            InboxReason::Unignored => write!(f, "unignored"),
            InboxReason::Regression => write!(f, "regression"),
            InboxReason::Manual => write!(f, "manual"),
            InboxReason::Reprocessed => write!(f, "reprocessed"),
        }
    }
}

/// A group awaiting triage. At most one inbox row exists per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInbox {
    pub id: Uuid,
    pub group_id: Uuid,
    pub project_id: Uuid,
    pub reason: InboxReason,
    /// Free-form context for the reason (e.g. the event that triggered a
    /// regression).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_details: Option<serde_json::Value>,
    pub date_added: DateTime<Utc>,
}

/// Input for moving a group into the inbox.
///
/// `date_added` is caller-supplied so backfills and tests can control it;
/// normal callers pass `Utc::now()`.
#[derive(Debug, Clone)]
pub struct AddGroupInbox {
    pub group_id: Uuid,
    pub project_id: Uuid,
    pub reason: InboxReason,
    pub reason_details: Option<serde_json::Value>,
    pub date_added: DateTime<Utc>,
}
