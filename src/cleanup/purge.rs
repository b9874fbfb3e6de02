//! Batched time-windowed purge of stale inbox rows.
//!
//! The purge never scans the whole table and never holds one long
//! transaction: it pages stale row IDs and deletes page by page, each page
//! committing on its own. Eligibility is an absolute cutoff (`date_added`
//! strictly before it), so reruns and overlapping runs are safe: a row is
//! either still stale or already gone, and deletion by ID reports the rows
//! actually removed.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::db::{DbResult, GroupInboxRepo};

/// Tuning for a single purge run.
#[derive(Debug, Clone)]
pub struct PurgeOptions {
    /// Rows with `date_added` strictly before this instant are eligible.
    pub cutoff: DateTime<Utc>,
    /// Row IDs fetched and deleted per page.
    pub batch_size: u32,
    /// Upper bound on deletions for this run. Zero means unlimited.
    pub max_deletes: u64,
    /// Elapsed time after which a warning is logged; the run continues.
    pub soft_time_limit: Duration,
    /// Elapsed time after which the run stops between pages.
    pub time_limit: Duration,
}

/// What a purge run accomplished.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// Rows actually deleted.
    pub deleted: u64,
    /// Pages processed.
    pub pages: u32,
    /// True when no eligible rows remained at exit. False when the run
    /// stopped early on the delete cap or the time limit; the next run
    /// picks up where this one left off.
    pub exhausted: bool,
}

/// Delete inbox rows older than the cutoff, in pages.
///
/// Returns after the backlog is drained, the delete cap is reached, or the
/// hard time limit passes. Partial progress stays committed either way. A
/// storage error on any page propagates immediately; pages deleted before
/// it remain deleted.
pub async fn purge_stale_inbox(
    repo: &dyn GroupInboxRepo,
    opts: &PurgeOptions,
) -> DbResult<PurgeOutcome> {
    let started = Instant::now();
    let max_deletes = if opts.max_deletes == 0 {
        u64::MAX
    } else {
        opts.max_deletes
    };

    let mut outcome = PurgeOutcome::default();
    let mut soft_limit_warned = false;

    loop {
        let remaining = max_deletes - outcome.deleted;
        if remaining == 0 {
            // Cap reached with rows possibly left over.
            return Ok(outcome);
        }
        let page_limit = remaining.min(u64::from(opts.batch_size)) as u32;

        let ids = repo.stale_ids(opts.cutoff, page_limit).await?;
        if ids.is_empty() {
            outcome.exhausted = true;
            return Ok(outcome);
        }
        let short_page = (ids.len() as u32) < page_limit;

        // Each page is its own transaction; earlier pages stay committed
        // if this one fails.
        outcome.deleted += repo.delete_by_ids(&ids).await?;
        outcome.pages += 1;

        if short_page {
            // A short page means nothing eligible is left.
            outcome.exhausted = true;
            return Ok(outcome);
        }

        let elapsed = started.elapsed();
        if elapsed >= opts.time_limit {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                deleted = outcome.deleted,
                pages = outcome.pages,
                "Purge run hit its time limit with rows remaining, stopping"
            );
            return Ok(outcome);
        }
        if !soft_limit_warned && elapsed >= opts.soft_time_limit {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                deleted = outcome.deleted,
                "Purge run passed its soft time limit"
            );
            soft_limit_warned = true;
        }
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        db::{
            repos::{GroupRepo, OrganizationRepo, ProjectRepo, truncate_to_millis},
            sqlite::{
                SqliteGroupInboxRepo, SqliteGroupRepo, SqliteOrganizationRepo, SqliteProjectRepo,
            },
            tests::harness::{create_sqlite_pool, run_sqlite_migrations},
        },
        models::{AddGroupInbox, CreateGroup, CreateOrganization, CreateProject, GroupInbox,
                 InboxReason},
    };

    struct PurgeHarness {
        inbox: SqliteGroupInboxRepo,
        groups: SqliteGroupRepo,
        project_id: Uuid,
    }

    async fn setup() -> PurgeHarness {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;

        let org = SqliteOrganizationRepo::new(pool.clone())
            .create(CreateOrganization {
                slug: "purge-org".into(),
                name: "Purge Org".into(),
            })
            .await
            .unwrap();
        let project = SqliteProjectRepo::new(pool.clone())
            .create(CreateProject {
                organization_id: org.id,
                slug: "purge-project".into(),
                name: "Purge Project".into(),
                platform: None,
            })
            .await
            .unwrap();

        PurgeHarness {
            inbox: SqliteGroupInboxRepo::new(pool.clone()),
            groups: SqliteGroupRepo::new(pool),
            project_id: project.id,
        }
    }

    impl PurgeHarness {
        /// Create a fresh group and put it in the inbox at `date_added`.
        async fn add_row(&self, date_added: chrono::DateTime<Utc>) -> GroupInbox {
            let group = self
                .groups
                .create(CreateGroup {
                    project_id: self.project_id,
                    title: "NullPointerException".into(),
                    culprit: None,
                    level: None,
                })
                .await
                .unwrap();
            self.inbox
                .add(AddGroupInbox {
                    group_id: group.id,
                    project_id: self.project_id,
                    reason: InboxReason::New,
                    reason_details: None,
                    date_added,
                })
                .await
                .unwrap()
        }

        fn options(&self, cutoff: chrono::DateTime<Utc>) -> PurgeOptions {
            PurgeOptions {
                cutoff,
                batch_size: 100,
                max_deletes: 0,
                soft_time_limit: std::time::Duration::from_secs(20),
                time_limit: std::time::Duration::from_secs(30),
            }
        }
    }

    #[tokio::test]
    async fn test_purge_removes_only_rows_older_than_cutoff() {
        let h = setup().await;
        let now = Utc::now();
        let cutoff = now - Duration::days(7);

        let old_a = h.add_row(cutoff - Duration::days(1)).await;
        let old_b = h.add_row(cutoff - Duration::minutes(5)).await;
        let fresh = h.add_row(now - Duration::days(3)).await;

        let outcome = purge_stale_inbox(&h.inbox, &h.options(cutoff)).await.unwrap();

        assert_eq!(outcome.deleted, 2);
        assert!(outcome.exhausted);
        assert!(h.inbox.get_by_group(old_a.group_id).await.unwrap().is_none());
        assert!(h.inbox.get_by_group(old_b.group_id).await.unwrap().is_none());
        assert!(h.inbox.get_by_group(fresh.group_id).await.unwrap().is_some());
        assert_eq!(h.inbox.count_added_before(cutoff).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let h = setup().await;
        let cutoff = Utc::now() - Duration::days(7);
        for i in 1..=3i64 {
            h.add_row(cutoff - Duration::hours(i)).await;
        }

        let first = purge_stale_inbox(&h.inbox, &h.options(cutoff)).await.unwrap();
        assert_eq!(first.deleted, 3);
        assert!(first.exhausted);

        let second = purge_stale_inbox(&h.inbox, &h.options(cutoff)).await.unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(second.pages, 0);
        assert!(second.exhausted);
    }

    #[tokio::test]
    async fn test_purge_pages_through_large_backlog() {
        let h = setup().await;
        let cutoff = Utc::now() - Duration::days(7);
        for i in 1..=25i64 {
            h.add_row(cutoff - Duration::minutes(i)).await;
        }
        for i in 1..=3i64 {
            h.add_row(cutoff + Duration::minutes(i)).await;
        }

        let mut opts = h.options(cutoff);
        opts.batch_size = 10;
        let outcome = purge_stale_inbox(&h.inbox, &opts).await.unwrap();

        assert_eq!(outcome.deleted, 25);
        assert_eq!(outcome.pages, 3);
        assert!(outcome.exhausted);
        assert_eq!(h.inbox.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_purges_converge() {
        let h = setup().await;
        let cutoff = Utc::now() - Duration::days(7);
        for i in 1..=12i64 {
            h.add_row(cutoff - Duration::minutes(i)).await;
        }
        let keeper = h.add_row(Utc::now()).await;

        let mut opts = h.options(cutoff);
        opts.batch_size = 4;
        let (a, b) = tokio::join!(
            purge_stale_inbox(&h.inbox, &opts),
            purge_stale_inbox(&h.inbox, &opts),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        // Between them the runs deleted each stale row exactly once.
        assert_eq!(a.deleted + b.deleted, 12);
        assert_eq!(h.inbox.count_added_before(cutoff).await.unwrap(), 0);
        assert_eq!(h.inbox.count().await.unwrap(), 1);
        assert!(h.inbox.get_by_group(keeper.group_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_large_uniform_backlog() {
        let h = setup().await;
        // 10k rows spread evenly over 30 days at millisecond precision, so
        // stored timestamps compare exactly.
        let now = truncate_to_millis(Utc::now());
        let cutoff = now - Duration::days(7);

        let mut expected = 0u64;
        for i in 0..10_000i64 {
            let date_added = now - Duration::milliseconds(i * 259_200);
            if date_added < cutoff {
                expected += 1;
            }
            h.add_row(date_added).await;
        }
        assert!(expected > 0);

        let mut opts = h.options(cutoff);
        opts.batch_size = 500;
        let outcome = purge_stale_inbox(&h.inbox, &opts).await.unwrap();

        assert_eq!(outcome.deleted, expected);
        assert!(outcome.exhausted);
        assert_eq!(h.inbox.count_added_before(cutoff).await.unwrap(), 0);
        assert_eq!(h.inbox.count().await.unwrap(), 10_000 - expected as i64);
    }

    #[tokio::test]
    async fn test_row_stamped_exactly_at_cutoff_survives() {
        let h = setup().await;
        // A zero-day max age makes the cutoff "right now"; only strictly
        // older rows are eligible.
        let now = truncate_to_millis(Utc::now());
        let row = h.add_row(now).await;

        let outcome = purge_stale_inbox(&h.inbox, &h.options(now)).await.unwrap();

        assert_eq!(outcome.deleted, 0);
        assert!(outcome.exhausted);
        assert!(h.inbox.get_by_group(row.group_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_respects_delete_cap() {
        let h = setup().await;
        let cutoff = Utc::now() - Duration::days(7);
        for i in 1..=10i64 {
            h.add_row(cutoff - Duration::minutes(i)).await;
        }

        let mut opts = h.options(cutoff);
        opts.batch_size = 4;
        opts.max_deletes = 6;
        let outcome = purge_stale_inbox(&h.inbox, &opts).await.unwrap();

        assert_eq!(outcome.deleted, 6);
        assert_eq!(outcome.pages, 2);
        assert!(!outcome.exhausted);
        assert_eq!(h.inbox.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_purge_stops_at_hard_time_limit() {
        let h = setup().await;
        let cutoff = Utc::now() - Duration::days(7);
        for i in 1..=6i64 {
            h.add_row(cutoff - Duration::minutes(i)).await;
        }

        let mut opts = h.options(cutoff);
        opts.batch_size = 2;
        opts.soft_time_limit = std::time::Duration::ZERO;
        opts.time_limit = std::time::Duration::ZERO;
        let stopped = purge_stale_inbox(&h.inbox, &opts).await.unwrap();

        assert_eq!(stopped.deleted, 2);
        assert_eq!(stopped.pages, 1);
        assert!(!stopped.exhausted);

        // The next run picks up the remainder.
        let resumed = purge_stale_inbox(&h.inbox, &h.options(cutoff)).await.unwrap();
        assert_eq!(resumed.deleted, 4);
        assert!(resumed.exhausted);
        assert_eq!(h.inbox.count().await.unwrap(), 0);
    }
}
