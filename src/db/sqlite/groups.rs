use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::DbResult,
        repos::{GroupRepo, truncate_to_millis},
    },
    models::{CreateGroup, Group},
};

pub struct SqliteGroupRepo {
    pool: SqlitePool,
}

impl SqliteGroupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_group(row: &SqliteRow) -> DbResult<Group> {
        Ok(Group {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            project_id: parse_uuid(&row.get::<String, _>("project_id"))?,
            title: row.get("title"),
            culprit: row.get("culprit"),
            level: row.get("level"),
            status: row.get("status"),
            times_seen: row.get("times_seen"),
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
        })
    }
}

#[async_trait]
impl GroupRepo for SqliteGroupRepo {
    async fn create(&self, input: CreateGroup) -> DbResult<Group> {
        let id = Uuid::new_v4();
        let now = truncate_to_millis(chrono::Utc::now());
        let level = input.level.unwrap_or_else(|| "error".to_string());

        sqlx::query(
            r#"
            INSERT INTO groups (id, project_id, title, culprit, level, status, times_seen, first_seen, last_seen)
            VALUES (?, ?, ?, ?, ?, 'unresolved', 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.project_id.to_string())
        .bind(&input.title)
        .bind(&input.culprit)
        .bind(&level)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Group {
            id,
            project_id: input.project_id,
            title: input.title,
            culprit: input.culprit,
            level,
            status: "unresolved".to_string(),
            times_seen: 1,
            first_seen: now,
            last_seen: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, title, culprit, level, status, times_seen, first_seen, last_seen
            FROM groups
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_group).transpose()
    }
}
