use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::DbResult,
        repos::{GroupRepo, truncate_to_millis},
    },
    models::{CreateGroup, Group},
};

pub struct PostgresGroupRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresGroupRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn row_to_group(row: &PgRow) -> Group {
        Group {
            id: row.get("id"),
            project_id: row.get("project_id"),
            title: row.get("title"),
            culprit: row.get("culprit"),
            level: row.get("level"),
            status: row.get("status"),
            times_seen: row.get("times_seen"),
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
        }
    }
}

#[async_trait]
impl GroupRepo for PostgresGroupRepo {
    async fn create(&self, input: CreateGroup) -> DbResult<Group> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());
        let level = input.level.unwrap_or_else(|| "error".to_string());

        let row = sqlx::query(
            r#"
            INSERT INTO groups (id, project_id, title, culprit, level, status, times_seen, first_seen, last_seen)
            VALUES ($1, $2, $3, $4, $5, 'unresolved', 1, $6, $7)
            RETURNING id, project_id, title, culprit, level, status, times_seen, first_seen, last_seen
            "#,
        )
        .bind(id)
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.culprit)
        .bind(&level)
        .bind(now)
        .bind(now)
        .fetch_one(&self.write_pool)
        .await?;

        Ok(Self::row_to_group(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, title, culprit, level, status, times_seen, first_seen, last_seen
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_group))
    }
}
