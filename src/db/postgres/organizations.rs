use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::DbResult,
        repos::{OrganizationRepo, truncate_to_millis},
    },
    models::{CreateOrganization, Organization},
};

pub struct PostgresOrganizationRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresOrganizationRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl OrganizationRepo for PostgresOrganizationRepo {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());

        sqlx::query(
            "INSERT INTO organizations (id, slug, name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(now)
        .execute(&self.write_pool)
        .await?;

        Ok(Organization {
            id,
            slug: input.slug,
            name: input.name,
            created_at: now,
        })
    }

    async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Organization>> {
        let row =
            sqlx::query("SELECT id, slug, name, created_at FROM organizations WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.read_pool)
                .await?;

        Ok(row.map(|row| Organization {
            id: row.get("id"),
            slug: row.get("slug"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }))
    }
}
