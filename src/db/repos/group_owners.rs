use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{GroupOwner, UpsertGroupOwner},
};

#[async_trait]
pub trait GroupOwnerRepo: Send + Sync {
    /// Record or replace the owner attribution for a group.
    async fn upsert(&self, input: UpsertGroupOwner) -> DbResult<GroupOwner>;

    /// Get a group's owner attribution, if any.
    async fn get_by_group(&self, group_id: Uuid) -> DbResult<Option<GroupOwner>>;

    /// Remove a group's attribution. Returns true when a row existed.
    async fn delete_by_group(&self, group_id: Uuid) -> DbResult<bool>;
}
