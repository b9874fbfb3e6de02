use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{Cursor, GroupInboxRepo, ListParams, ListResult, truncate_to_millis},
    },
    models::{AddGroupInbox, GroupInbox, InboxReason},
};

pub struct SqliteGroupInboxRepo {
    pool: SqlitePool,
}

impl SqliteGroupInboxRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_reason(value: i64) -> DbResult<InboxReason> {
        i16::try_from(value)
            .ok()
            .and_then(InboxReason::from_i16)
            .ok_or_else(|| DbError::Internal(format!("Invalid inbox reason in database: {value}")))
    }

    fn row_to_inbox(row: &SqliteRow) -> DbResult<GroupInbox> {
        let details_str: Option<String> = row.get("reason_details");

        Ok(GroupInbox {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            group_id: parse_uuid(&row.get::<String, _>("group_id"))?,
            project_id: parse_uuid(&row.get::<String, _>("project_id"))?,
            reason: Self::parse_reason(row.get("reason"))?,
            reason_details: details_str.map(|s| serde_json::from_str(&s)).transpose()?,
            date_added: row.get("date_added"),
        })
    }
}

#[async_trait]
impl GroupInboxRepo for SqliteGroupInboxRepo {
    async fn add(&self, input: AddGroupInbox) -> DbResult<GroupInbox> {
        let id = Uuid::new_v4();
        // Truncate to milliseconds for cursor pagination compatibility (see cursor.rs)
        let date_added = truncate_to_millis(input.date_added);
        let details_json = input
            .reason_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // The unique index on group_id makes this a no-op when the group is
        // already in the inbox; the select below returns whichever row won.
        sqlx::query(
            r#"
            INSERT INTO group_inbox (id, group_id, project_id, reason, reason_details, date_added)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(group_id) DO NOTHING
            "#,
        )
        .bind(id.to_string())
        .bind(input.group_id.to_string())
        .bind(input.project_id.to_string())
        .bind(input.reason as i16)
        .bind(&details_json)
        .bind(date_added)
        .execute(&self.pool)
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
            WHERE group_id = ?
            "#,
        )
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
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

        // (date_added, id) row comparison keeps the ordering stable when
        // multiple rows share a timestamp.
        let sql = if params.cursor.is_some() {
            r#"
            SELECT id, group_id, project_id, reason, reason_details, date_added
            FROM group_inbox
            WHERE project_id = ? AND (date_added, id) < (?, ?)
            ORDER BY date_added DESC, id DESC
            LIMIT ?
            "#
        } else {
            r#"
            SELECT id, group_id, project_id, reason, reason_details, date_added
            FROM group_inbox
            WHERE project_id = ?
            ORDER BY date_added DESC, id DESC
            LIMIT ?
            "#
        };

        let mut query = sqlx::query(sql).bind(project_id.to_string());
        if let Some(cursor) = &params.cursor {
            query = query.bind(cursor.date_added).bind(cursor.id.to_string());
        }
        query = query.bind(fetch_limit);

        let rows = query.fetch_all(&self.pool).await?;

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
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    // ==================== Cleanup Operations ====================

    async fn count_added_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM group_inbox WHERE date_added < ?")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn stale_ids(&self, cutoff: DateTime<Utc>, limit: u32) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM group_inbox WHERE date_added < ? LIMIT ?")
            .bind(cutoff)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| parse_uuid(&row.get::<String, _>("id")))
            .collect()
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM group_inbox WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
