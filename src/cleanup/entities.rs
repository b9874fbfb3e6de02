//! Registry of purgeable entities.
//!
//! Config validation resolves the configured entity and timestamp field
//! against this registry, so a typo fails at load time instead of on the
//! first scheduled run.

/// A record collection the cleanup worker knows how to purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeEntity {
    /// Rows in `group_inbox`, the new-issue triage queue.
    GroupInbox,
}

impl PurgeEntity {
    /// Resolve a configured entity name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "group_inbox" => Some(Self::GroupInbox),
            _ => None,
        }
    }

    /// All recognized entity names, for error messages.
    pub fn known_names() -> &'static [&'static str] {
        &["group_inbox"]
    }

    /// Timestamp fields that can serve as the age cutoff for this entity.
    pub fn timestamp_fields(&self) -> &'static [&'static str] {
        match self {
            Self::GroupInbox => &["date_added"],
        }
    }

    /// Whether `field` is a valid age cutoff field for this entity.
    pub fn supports_timestamp_field(&self, field: &str) -> bool {
        self.timestamp_fields().contains(&field)
    }

    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GroupInbox => "group_inbox",
        }
    }
}
