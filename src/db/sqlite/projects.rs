use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::DbResult,
        repos::{ProjectRepo, truncate_to_millis},
    },
    models::{CreateProject, CreateProjectKey, Project, ProjectKey},
};

pub struct SqliteProjectRepo {
    pool: SqlitePool,
}

impl SqliteProjectRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_project(row: &SqliteRow) -> DbResult<Project> {
        Ok(Project {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            organization_id: parse_uuid(&row.get::<String, _>("organization_id"))?,
            slug: row.get("slug"),
            name: row.get("name"),
            platform: row.get("platform"),
            created_at: row.get("created_at"),
        })
    }

    fn row_to_key(row: &SqliteRow) -> DbResult<ProjectKey> {
        Ok(ProjectKey {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            project_id: parse_uuid(&row.get::<String, _>("project_id"))?,
            public_key: row.get("public_key"),
            secret_key: row.get("secret_key"),
            label: row.get("label"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl ProjectRepo for SqliteProjectRepo {
    async fn create(&self, input: CreateProject) -> DbResult<Project> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());

        sqlx::query(
            r#"
            INSERT INTO projects (id, organization_id, slug, name, platform, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.organization_id.to_string())
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.platform)
        .bind(now)
        .execute(&self.pool)
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
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn get_by_slug(&self, organization_id: Uuid, slug: &str) -> DbResult<Option<Project>> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, slug, name, platform, created_at
            FROM projects
            WHERE organization_id = ? AND slug = ?
            "#,
        )
        .bind(organization_id.to_string())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_project).transpose()
    }

    async fn first_key(&self, project_id: Uuid) -> DbResult<Option<ProjectKey>> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, public_key, secret_key, label, is_active, created_at
            FROM project_keys
            WHERE project_id = ? AND is_active = 1
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_key).transpose()
    }

    async fn create_key(&self, input: CreateProjectKey) -> DbResult<ProjectKey> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());
        let public_key = Uuid::new_v4().simple().to_string();
        let secret_key = Uuid::new_v4().simple().to_string();

        sqlx::query(
            r#"
            INSERT INTO project_keys (id, project_id, public_key, secret_key, label, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.project_id.to_string())
        .bind(&public_key)
        .bind(&secret_key)
        .bind(&input.label)
        .bind(now)
        .execute(&self.pool)
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

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        sqlx::query(
            r#"
            CREATE TABLE projects (
                id TEXT PRIMARY KEY NOT NULL,
                organization_id TEXT NOT NULL,
                slug TEXT NOT NULL,
                name TEXT NOT NULL,
                platform TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (organization_id, slug)
            )
            "#,
        )
        .execute(&pool)
        .await
        .expect("Failed to create projects table");

        sqlx::query(
            r#"
            CREATE TABLE project_keys (
                id TEXT PRIMARY KEY NOT NULL,
                project_id TEXT NOT NULL,
                public_key TEXT NOT NULL UNIQUE,
                secret_key TEXT NOT NULL,
                label TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .expect("Failed to create project_keys table");

        pool
    }

    fn create_input(organization_id: Uuid, slug: &str) -> CreateProject {
        CreateProject {
            organization_id,
            slug: slug.to_string(),
            name: slug.to_string(),
            platform: Some("python".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_id() {
        let repo = SqliteProjectRepo::new(create_test_pool().await);
        let org_id = Uuid::new_v4();

        let project = repo.create(create_input(org_id, "backend")).await.unwrap();
        let fetched = repo.get_by_id(project.id).await.unwrap().unwrap();

        assert_eq!(fetched.slug, "backend");
        assert_eq!(fetched.organization_id, org_id);
        assert_eq!(fetched.platform.as_deref(), Some("python"));
    }

    #[tokio::test]
    async fn test_get_by_slug_is_org_scoped() {
        let repo = SqliteProjectRepo::new(create_test_pool().await);
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();

        let in_a = repo.create(create_input(org_a, "backend")).await.unwrap();
        let in_b = repo.create(create_input(org_b, "backend")).await.unwrap();

        let found = repo.get_by_slug(org_a, "backend").await.unwrap().unwrap();
        assert_eq!(found.id, in_a.id);
        assert_ne!(found.id, in_b.id);

        assert!(
            repo.get_by_slug(Uuid::new_v4(), "backend")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_create_key_generates_material() {
        let repo = SqliteProjectRepo::new(create_test_pool().await);

        let key = repo
            .create_key(CreateProjectKey {
                project_id: Uuid::new_v4(),
                label: Some("Default".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(key.public_key.len(), 32);
        assert_eq!(key.secret_key.len(), 32);
        assert_ne!(key.public_key, key.secret_key);
        assert!(key.is_active);
    }

    #[tokio::test]
    async fn test_first_key_returns_oldest_active() {
        let pool = create_test_pool().await;
        let repo = SqliteProjectRepo::new(pool.clone());
        let project_id = Uuid::new_v4();

        let oldest = repo
            .create_key(CreateProjectKey {
                project_id,
                label: None,
            })
            .await
            .unwrap();
        // Force distinct created_at values.
        sqlx::query("UPDATE project_keys SET created_at = ? WHERE id = ?")
            .bind(oldest.created_at - chrono::Duration::hours(1))
            .bind(oldest.id.to_string())
            .execute(&pool)
            .await
            .unwrap();
        repo.create_key(CreateProjectKey {
            project_id,
            label: None,
        })
        .await
        .unwrap();

        let first = repo.first_key(project_id).await.unwrap().unwrap();
        assert_eq!(first.id, oldest.id);
    }

    #[tokio::test]
    async fn test_first_key_skips_inactive() {
        let pool = create_test_pool().await;
        let repo = SqliteProjectRepo::new(pool.clone());
        let project_id = Uuid::new_v4();

        let key = repo
            .create_key(CreateProjectKey {
                project_id,
                label: None,
            })
            .await
            .unwrap();
        sqlx::query("UPDATE project_keys SET is_active = 0 WHERE id = ?")
            .bind(key.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        assert!(repo.first_key(project_id).await.unwrap().is_none());
    }
}
