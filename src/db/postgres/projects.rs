use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::DbResult,
        repos::{ProjectRepo, truncate_to_millis},
    },
    models::{CreateProject, CreateProjectKey, Project, ProjectKey},
};

pub struct PostgresProjectRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresProjectRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn row_to_project(row: &PgRow) -> Project {
        Project {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            slug: row.get("slug"),
            name: row.get("name"),
            platform: row.get("platform"),
            created_at: row.get("created_at"),
        }
    }

    fn row_to_key(row: &PgRow) -> ProjectKey {
        ProjectKey {
            id: row.get("id"),
            project_id: row.get("project_id"),
            public_key: row.get("public_key"),
            secret_key: row.get("secret_key"),
            label: row.get("label"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ProjectRepo for PostgresProjectRepo {
    async fn create(&self, input: CreateProject) -> DbResult<Project> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());

        sqlx::query(
            r#"
            INSERT INTO projects (id, organization_id, slug, name, platform, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(input.organization_id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.platform)
        .bind(now)
        .execute(&self.write_pool)
        .await?;

        Ok(Project {
            id,
            organization_id: input.organization_id,
            slug: input.slug,
            name: input.name,
            platform: input.platform,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Project>> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, slug, name, platform, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_project))
    }

    async fn get_by_slug(&self, organization_id: Uuid, slug: &str) -> DbResult<Option<Project>> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, slug, name, platform, created_at
            FROM projects
            WHERE organization_id = $1 AND slug = $2
            "#,
        )
        .bind(organization_id)
        .bind(slug)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_project))
    }

    async fn first_key(&self, project_id: Uuid) -> DbResult<Option<ProjectKey>> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, public_key, secret_key, label, is_active, created_at
            FROM project_keys
            WHERE project_id = $1 AND is_active
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_key))
    }

    async fn create_key(&self, input: CreateProjectKey) -> DbResult<ProjectKey> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());
        let public_key = Uuid::new_v4().simple().to_string();
        let secret_key = Uuid::new_v4().simple().to_string();

        sqlx::query(
            r#"
            INSERT INTO project_keys (id, project_id, public_key, secret_key, label, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            "#,
        )
        .bind(id)
        .bind(input.project_id)
        .bind(&public_key)
        .bind(&secret_key)
        .bind(&input.label)
        .bind(now)
        .execute(&self.write_pool)
        .await?;

        Ok(ProjectKey {
            id,
            project_id: input.project_id,
            public_key,
            secret_key,
            label: input.label,
            is_active: true,
            created_at: now,
        })
    }
}
