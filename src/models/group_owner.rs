use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an owner was attributed to a group.
///
/// Stored as a small integer. The discriminants are part of the schema and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum GroupOwnerType {
    /// Attributed from the commit most likely to have introduced the error.
    SuspectCommit = 0,
    /// Attributed from a matching ownership rule.
    OwnershipRule = 1,
}

impl GroupOwnerType {
    /// Decode the stored small-int form. Returns None for unknown values.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(GroupOwnerType::SuspectCommit),
            1 => Some(GroupOwnerType::OwnershipRule),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupOwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupOwnerType::SuspectCommit => write!(f, "suspect_commit"),
            GroupOwnerType::OwnershipRule => write!(f, "ownership_rule"),
        }
    }
}

/// The team or user most likely responsible for a group's errors.
/// At most one owner row exists per group; either `team_id` or `user_id`
/// is set, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOwner {
    pub id: Uuid,
    pub group_id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub owner_type: GroupOwnerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub date_added: DateTime<Utc>,
}

/// Input for recording (or replacing) a group's owner attribution.
#[derive(Debug, Clone)]
pub struct UpsertGroupOwner {
    pub group_id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub owner_type: GroupOwnerType,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}
