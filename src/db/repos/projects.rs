use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateProject, CreateProjectKey, Project, ProjectKey},
};

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn create(&self, input: CreateProject) -> DbResult<Project>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Project>>;
    /// Slugs are unique per organization, so lookups are org-scoped.
    async fn get_by_slug(&self, organization_id: Uuid, slug: &str)
    -> DbResult<Option<Project>>;

    /// The project's oldest active key.
    ///
    /// Debug and onboarding surfaces use this as the project's default DSN
    /// key.
    async fn first_key(&self, project_id: Uuid) -> DbResult<Option<ProjectKey>>;

    /// Create a client key with freshly generated key material.
    async fn create_key(&self, input: CreateProjectKey) -> DbResult<ProjectKey>;
}
