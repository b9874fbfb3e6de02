use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::DbResult,
        repos::{OrganizationRepo, truncate_to_millis},
    },
    models::{CreateOrganization, Organization},
};

pub struct SqliteOrganizationRepo {
    pool: SqlitePool,
}

impl SqliteOrganizationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepo for SqliteOrganizationRepo {
    async fn create(&self, input: CreateOrganization) -> DbResult<Organization> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());

        sqlx::query("INSERT INTO organizations (id, slug, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(&input.slug)
            .bind(&input.name)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Organization {
            id,
            slug: input.slug,
            name: input.name,
            created_at: now,
        })
    }

    async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Organization>> {
        let row = sqlx::query("SELECT id, slug, name, created_at FROM organizations WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Organization {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                slug: row.get("slug"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
        })
        .transpose()
    }
}
