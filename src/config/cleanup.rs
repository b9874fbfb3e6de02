//! Inbox cleanup configuration.
//!
//! Configures the scheduled job that prunes stale rows from the triage
//! inbox so review queues only show recent, actionable errors.
//!
//! # Example
//!
//! ```toml
//! [cleanup]
//! enabled = true
//! interval_hours = 1
//! max_age_days = 7
//!
//! [cleanup.safety]
//! dry_run = false
//! max_deletes_per_run = 100000
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::cleanup::entities::PurgeEntity;

/// Inbox cleanup configuration.
///
/// When enabled, a background worker periodically deletes inbox records
/// whose timestamp is older than the configured age.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    /// Whether scheduled cleanup is enabled.
    /// Default: false (must be explicitly enabled)
    #[serde(default)]
    pub enabled: bool,

    /// How often to run the cleanup worker (in hours).
    /// Default: 1
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Which record collection to prune.
    /// Must name a registered purgeable entity.
    /// Default: "group_inbox"
    #[serde(default = "default_entity")]
    pub entity: String,

    /// The timestamp field eligibility is computed from.
    /// Must be a purgeable field of the configured entity.
    /// Default: "date_added"
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Records older than this many days are deleted.
    /// 0 means "older than right now", which still uses a strict
    /// comparison: a record stamped exactly at the cutoff survives.
    /// Default: 7
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Safety settings to prevent accidental data loss.
    #[serde(default)]
    pub safety: CleanupSafety,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            entity: default_entity(),
            timestamp_field: default_timestamp_field(),
            max_age_days: default_max_age_days(),
            safety: CleanupSafety::default(),
        }
    }
}

fn default_interval_hours() -> u64 {
    1
}

fn default_entity() -> String {
    "group_inbox".to_string()
}

fn default_timestamp_field() -> String {
    "date_added".to_string()
}

fn default_max_age_days() -> u32 {
    7
}

/// Safety settings for cleanup operations.
///
/// These settings help prevent accidental data loss and allow testing
/// cleanup policies before enabling them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupSafety {
    /// If true, log what would be deleted without actually deleting.
    /// Useful for testing cleanup policies.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum number of records to delete per run.
    /// Prevents long-running delete operations that could impact performance.
    /// Set to 0 for unlimited.
    /// Default: 100000
    #[serde(default = "default_max_deletes_per_run")]
    pub max_deletes_per_run: u64,

    /// Batch size for delete operations.
    /// Records are deleted in batches to avoid locking the database.
    /// Default: 1000
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Seconds into a run after which a warning is logged.
    /// Default: 20
    #[serde(default = "default_soft_time_limit")]
    pub soft_time_limit_secs: u64,

    /// Seconds after which a run stops between batches, keeping the
    /// deletions already committed. The next run picks up the rest.
    /// Default: 30
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u64,
}

impl Default for CleanupSafety {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_deletes_per_run: default_max_deletes_per_run(),
            batch_size: default_batch_size(),
            soft_time_limit_secs: default_soft_time_limit(),
            time_limit_secs: default_time_limit(),
        }
    }
}

fn default_max_deletes_per_run() -> u64 {
    100_000
}

fn default_batch_size() -> u32 {
    1000
}

fn default_soft_time_limit() -> u64 {
    20
}

fn default_time_limit() -> u64 {
    30
}

impl CleanupConfig {
    /// Get the interval as a Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours * 3600)
    }

    /// Resolve the configured entity against the purgeable-entity registry.
    ///
    /// Configuration mistakes here must fail at load time, not on the
    /// first scheduled run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let entity = PurgeEntity::parse(&self.entity).ok_or_else(|| {
            ConfigError::Validation(format!(
                "Unknown cleanup entity '{}'. Known entities: {}",
                self.entity,
                PurgeEntity::known_names().join(", ")
            ))
        })?;

        if !entity.supports_timestamp_field(&self.timestamp_field) {
            return Err(ConfigError::Validation(format!(
                "Entity '{}' has no purgeable timestamp field '{}'. Purgeable fields: {}",
                self.entity,
                self.timestamp_field,
                entity.timestamp_fields().join(", ")
            )));
        }

        if self.safety.batch_size == 0 {
            return Err(ConfigError::Validation(
                "cleanup.safety.batch_size must be at least 1".into(),
            ));
        }

        if self.safety.time_limit_secs < self.safety.soft_time_limit_secs {
            return Err(ConfigError::Validation(
                "cleanup.safety.time_limit_secs must not be smaller than soft_time_limit_secs"
                    .into(),
            ));
        }

        Ok(())
    }
}

impl CleanupSafety {
    /// Soft limit as a Duration.
    pub fn soft_time_limit(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.soft_time_limit_secs)
    }

    /// Hard limit as a Duration.
    pub fn time_limit(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.time_limit_secs)
    }
}
