//! Background worker for scheduled inbox cleanup.
//!
//! Plays the role the external task scheduler had in the original
//! deployment: it invokes the named purge task on a fixed interval, with
//! parameters taken from configuration rather than the call site. Errors
//! are logged and the worker waits for the next interval; the purge is
//! idempotent, so the retry policy is simply "try again next tick".

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    cleanup::entities::PurgeEntity,
    cleanup::purge::{PurgeOptions, purge_stale_inbox},
    config::CleanupConfig,
    db::DbPool,
    observability::metrics,
};

/// Scheduled-task name for the inbox purge.
pub const TASK_NAME: &str = "cleanup.auto_remove_inbox";

/// Results from a single cleanup run.
#[derive(Debug, Default)]
pub struct CleanupRunResult {
    /// Rows deleted from the inbox.
    pub deleted: u64,
    /// Pages the purge processed.
    pub pages: u32,
    /// Rows a dry run would have deleted.
    pub would_delete: u64,
    /// False when the run stopped on a safety rail with rows remaining.
    pub complete: bool,
}

impl CleanupRunResult {
    /// Whether the run deleted anything, or would have in dry-run mode.
    pub fn has_activity(&self) -> bool {
        self.deleted > 0 || self.would_delete > 0
    }
}

/// Starts the cleanup worker as a background task.
///
/// The worker runs in a loop, purging stale inbox rows at the configured
/// interval, until the shutdown token is cancelled. A run already in
/// progress finishes its current page before the loop observes the token.
pub async fn start_cleanup_worker(
    db: Arc<DbPool>,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    if !config.enabled {
        tracing::info!("Cleanup worker disabled by configuration");
        return;
    }

    // Config validation resolved the entity at load time, so this only
    // fails if the worker was handed an unvalidated config.
    let Some(entity) = PurgeEntity::parse(&config.entity) else {
        tracing::error!(
            entity = %config.entity,
            "Unknown cleanup entity, worker not started"
        );
        return;
    };

    let dry_run_msg = if config.safety.dry_run {
        " (DRY RUN)"
    } else {
        ""
    };

    tracing::info!(
        task = TASK_NAME,
        interval_hours = config.interval_hours,
        entity = entity.label(),
        timestamp_field = %config.timestamp_field,
        max_age_days = config.max_age_days,
        batch_size = config.safety.batch_size,
        max_deletes_per_run = config.safety.max_deletes_per_run,
        dry_run = config.safety.dry_run,
        "Starting cleanup worker{}",
        dry_run_msg
    );

    let interval = config.interval();

    loop {
        match run_cleanup(&db, &config, entity).await {
            Ok(result) => {
                if result.has_activity() {
                    tracing::info!(
                        task = TASK_NAME,
                        deleted = result.deleted,
                        pages = result.pages,
                        would_delete = result.would_delete,
                        complete = result.complete,
                        "Cleanup run complete{}",
                        dry_run_msg
                    );
                } else {
                    tracing::debug!(task = TASK_NAME, "Cleanup run complete, no stale rows");
                }
            }
            Err(e) => {
                tracing::error!(task = TASK_NAME, error = %e, "Error running cleanup");
                metrics::record_cleanup_error();
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(task = TASK_NAME, "Cleanup worker stopping");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Run a single purge pass over the inbox.
async fn run_cleanup(
    db: &Arc<DbPool>,
    config: &CleanupConfig,
    entity: PurgeEntity,
) -> Result<CleanupRunResult, Box<dyn std::error::Error + Send + Sync>> {
    let cutoff = Utc::now() - Duration::days(config.max_age_days as i64);
    let repo = db.group_inbox();

    if config.safety.dry_run {
        let would_delete = repo.count_added_before(cutoff).await?;
        tracing::info!(
            task = TASK_NAME,
            cutoff = %cutoff,
            would_delete,
            "DRY RUN: Would delete {} {} rows older than {}",
            would_delete,
            entity.label(),
            cutoff
        );
        return Ok(CleanupRunResult {
            would_delete,
            complete: true,
            ..Default::default()
        });
    }

    let started = Instant::now();
    let outcome = purge_stale_inbox(
        repo.as_ref(),
        &PurgeOptions {
            cutoff,
            batch_size: config.safety.batch_size,
            max_deletes: config.safety.max_deletes_per_run,
            soft_time_limit: config.safety.soft_time_limit(),
            time_limit: config.safety.time_limit(),
        },
    )
    .await?;

    if outcome.deleted > 0 {
        tracing::debug!(
            task = TASK_NAME,
            deleted = outcome.deleted,
            cutoff = %cutoff,
            "Deleted stale inbox rows"
        );
        metrics::record_cleanup_deletion(entity.label(), outcome.deleted);
    }
    metrics::record_cleanup_run_duration(started.elapsed());

    Ok(CleanupRunResult {
        deleted: outcome.deleted,
        pages: outcome.pages,
        would_delete: 0,
        complete: outcome.exhausted,
    })
}
