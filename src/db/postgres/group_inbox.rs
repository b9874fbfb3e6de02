use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{Cursor, GroupInboxRepo, ListParams, ListResult, truncate_to_millis},
    },
    models::{AddGroupInbox, GroupInbox, InboxReason},
};

pub struct PostgresGroupInboxRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresGroupInboxRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_reason(value: i16) -> DbResult<InboxReason> {
        InboxReason::from_i16(value)
            .ok_or_else(|| DbError::Internal(format!("Invalid inbox reason in database: {value}")))
    }

    fn row_to_inbox(row: &PgRow) -> DbResult<GroupInbox> {
        Ok(GroupInbox {
            id: row.get("id"),
            group_id: row.get("group_id"),
            project_id: row.get("project_id"),
            reason: Self::parse_reason(row.get("reason"))?,
            reason_details: row.get("reason_details"),
            date_added: row.get("date_added"),
        })
    }
}

#[async_trait]
impl GroupInboxRepo for PostgresGroupInboxRepo {
    async fn add(&self, input: AddGroupInbox) -> DbResult<GroupInbox> {
        let id = Uuid::new_v4();
        // Truncate to milliseconds for cursor pagination compatibility (see cursor.rs)
        let date_added = truncate_to_millis(input.date_added);

        // The unique index on group_id makes this a no-op when the group is
        // already in the inbox; the select below returns whichever row won.
        sqlx::query(
            r#"
            INSERT INTO group_inbox (id, group_id, project_id, reason, reason_details, date_added)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (group_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(input.group_id)
        .bind(input.project_id)
        .bind(input.reason as i16)
        .bind(&input.reason_details)
        .bind(date_added)
        .execute(&self.write_pool)
        .await?;

        match self.get_by_group(input.group_id).await? {
            Some(inbox) => Ok(inbox),
            None => Err(DbError::Internal(
                "group_inbox row missing after insert".to_string(),
            )),
        }
    }

    async fn get_by_group(&self, group_id: Uuid) -> DbResult<Option<GroupInbox>> {
        let row = sqlx::query(
            r#"
            SELECT id, group_id, project_id, reason, reason_details, date_added
            FROM group_inbox
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.read_pool)
        .await?;

        row.as_ref().map(Self::row_to_inbox).transpose()
    }

    async fn list_by_project(
        &self,
        project_id: Uuid,
        params: ListParams,
    ) -> DbResult<ListResult<GroupInbox>> {
        let limit = params.limit.unwrap_or(100);
        let fetch_limit = limit + 1; // Fetch one extra to determine if there are more items

        let sql = if params.cursor.is_some() {
            r#"
            SELECT id, group_id, project_id, reason, reason_details, date_added
            FROM group_inbox
            WHERE project_id = $1 AND (date_added, id) < ($2, $3)
            ORDER BY date_added DESC, id DESC
            LIMIT $4
            "#
        } else {
            r#"
            SELECT id, group_id, project_id, reason, reason_details, date_added
            FROM group_inbox
            WHERE project_id = $1
            ORDER BY date_added DESC, id DESC
            LIMIT $2
            "#
        };

        let mut query = sqlx::query(sql).bind(project_id);
        if let Some(cursor) = &params.cursor {
            query = query.bind(cursor.date_added).bind(cursor.id);
        }
        query = query.bind(fetch_limit);

        let rows = query.fetch_all(&self.read_pool).await?;

        let has_more = rows.len() as i64 > limit;
        let items: Vec<GroupInbox> = rows
            .iter()
            .take(limit as usize)
            .map(Self::row_to_inbox)
            .collect::<DbResult<Vec<_>>>()?;

        let next_cursor = if has_more {
            items.last().map(|i| Cursor::new(i.date_added, i.id))
        } else {
            None
        };

        Ok(ListResult {
            items,
            has_more,
            next_cursor,
        })
    }

    async fn count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM group_inbox")
            .fetch_one(&self.read_pool)
            .await?;
        Ok(row.get("count"))
    }

    // ==================== Cleanup Operations ====================

    async fn count_added_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM group_inbox WHERE date_added < $1")
            .bind(cutoff)
            .fetch_one(&self.read_pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn stale_ids(&self, cutoff: DateTime<Utc>, limit: u32) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM group_inbox WHERE date_added < $1 LIMIT $2")
            .bind(cutoff)
            .bind(limit as i64)
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM group_inbox WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected())
    }
}
