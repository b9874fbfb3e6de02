use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateGroup, Group},
};

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn create(&self, input: CreateGroup) -> DbResult<Group>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>>;
}
