use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An issue: the aggregate of similar error events in a project.
///
/// Groups are created by the ingest pipeline; this service only reads them
/// and manages their inbox/ownership rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    pub level: String,
    pub status: String,
    pub times_seen: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub project_id: Uuid,
    pub title: String,
    pub culprit: Option<String>,
    /// Severity, defaults to "error" when None.
    pub level: Option<String>,
}
