use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ListParams, ListResult};
use crate::{
    db::error::DbResult,
    models::{AddGroupInbox, GroupInbox},
};

#[async_trait]
pub trait GroupInboxRepo: Send + Sync {
    /// Move a group into the inbox.
    ///
    /// Idempotent: if the group already has an inbox row, that row is
    /// returned unchanged.
    async fn add(&self, input: AddGroupInbox) -> DbResult<GroupInbox>;

    /// Get the inbox row for a group, if any.
    async fn get_by_group(&self, group_id: Uuid) -> DbResult<Option<GroupInbox>>;

    /// List a project's inbox rows, newest first.
    async fn list_by_project(
        &self,
        project_id: Uuid,
        params: ListParams,
    ) -> DbResult<ListResult<GroupInbox>>;

    /// Total number of inbox rows.
    async fn count(&self) -> DbResult<i64>;

    // ==================== Cleanup Operations ====================
    //
    // The surface the batched purge runs on: count rows older than an
    // absolute cutoff, page their IDs, delete a page by ID. Each call is
    // its own short transaction.

    /// Count inbox rows with `date_added` strictly before the cutoff.
    async fn count_added_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;

    /// Fetch up to `limit` IDs of rows with `date_added` strictly before
    /// the cutoff. No ordering is guaranteed.
    async fn stale_ids(&self, cutoff: DateTime<Utc>, limit: u32) -> DbResult<Vec<Uuid>>;

    /// Delete rows by ID, returning how many were actually removed.
    ///
    /// IDs that no longer exist are skipped, so a page raced by a concurrent
    /// deleter under-counts instead of erroring.
    async fn delete_by_ids(&self, ids: &[Uuid]) -> DbResult<u64>;
}
