use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{GroupOwnerRepo, truncate_to_millis},
    },
    models::{GroupOwner, GroupOwnerType, UpsertGroupOwner},
};

pub struct SqliteGroupOwnerRepo {
    pool: SqlitePool,
}

impl SqliteGroupOwnerRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_owner_type(value: i64) -> DbResult<GroupOwnerType> {
        i16::try_from(value)
            .ok()
            .and_then(GroupOwnerType::from_i16)
            .ok_or_else(|| DbError::Internal(format!("Invalid owner type in database: {value}")))
    }

    fn row_to_owner(row: &SqliteRow) -> DbResult<GroupOwner> {
        let team_id: Option<String> = row.get("team_id");
        let user_id: Option<String> = row.get("user_id");

        Ok(GroupOwner {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            group_id: parse_uuid(&row.get::<String, _>("group_id"))?,
            organization_id: parse_uuid(&row.get::<String, _>("organization_id"))?,
            project_id: parse_uuid(&row.get::<String, _>("project_id"))?,
            owner_type: Self::parse_owner_type(row.get("owner_type"))?,
            team_id: team_id.as_deref().map(parse_uuid).transpose()?,
            user_id: user_id.as_deref().map(parse_uuid).transpose()?,
            date_added: row.get("date_added"),
        })
    }
}

#[async_trait]
impl GroupOwnerRepo for SqliteGroupOwnerRepo {
    async fn upsert(&self, input: UpsertGroupOwner) -> DbResult<GroupOwner> {
        let id = Uuid::new_v4();
        let date_added = truncate_to_millis(chrono::Utc::now());

        // One owner per group: a re-attribution replaces the previous owner
        // but keeps the original row id.
        sqlx::query(
            r#"
            INSERT INTO group_owners (id, group_id, organization_id, project_id, owner_type, team_id, user_id, date_added)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(group_id) DO UPDATE SET
                owner_type = excluded.owner_type,
                team_id = excluded.team_id,
                user_id = excluded.user_id,
                date_added = excluded.date_added
            "#,
        )
        .bind(id.to_string())
        .bind(input.group_id.to_string())
        .bind(input.organization_id.to_string())
        .bind(input.project_id.to_string())
        .bind(input.owner_type as i16)
        .bind(input.team_id.map(|t| t.to_string()))
        .bind(input.user_id.map(|u| u.to_string()))
        .bind(date_added)
        .execute(&self.pool)
        .await?;

        match self.get_by_group(input.group_id).await? {
            Some(owner) => Ok(owner),
            None => Err(DbError::Internal(
                "group_owners row missing after upsert".to_string(),
            )),
        }
    }

    async fn get_by_group(&self, group_id: Uuid) -> DbResult<Option<GroupOwner>> {
        let row = sqlx::query(
            r#"
            SELECT id, group_id, organization_id, project_id, owner_type, team_id, user_id, date_added
            FROM group_owners
            WHERE group_id = ?
            "#,
        )
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_owner).transpose()
    }

    async fn delete_by_group(&self, group_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM group_owners WHERE group_id = ?")
            .bind(group_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
