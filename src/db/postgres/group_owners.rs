use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{GroupOwnerRepo, truncate_to_millis},
    },
    models::{GroupOwner, GroupOwnerType, UpsertGroupOwner},
};

pub struct PostgresGroupOwnerRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresGroupOwnerRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_owner_type(value: i16) -> DbResult<GroupOwnerType> {
        GroupOwnerType::from_i16(value)
            .ok_or_else(|| DbError::Internal(format!("Invalid owner type in database: {value}")))
    }

    fn row_to_owner(row: &PgRow) -> DbResult<GroupOwner> {
        Ok(GroupOwner {
            id: row.get("id"),
            group_id: row.get("group_id"),
            organization_id: row.get("organization_id"),
            project_id: row.get("project_id"),
            owner_type: Self::parse_owner_type(row.get("owner_type"))?,
            team_id: row.get("team_id"),
            user_id: row.get("user_id"),
            date_added: row.get("date_added"),
        })
    }
}

#[async_trait]
impl GroupOwnerRepo for PostgresGroupOwnerRepo {
    async fn upsert(&self, input: UpsertGroupOwner) -> DbResult<GroupOwner> {
        let id = Uuid::new_v4();
        let date_added = truncate_to_millis(chrono::Utc::now());

        // One owner per group: a re-attribution replaces the previous owner
        // but keeps the original row id.
        let row = sqlx::query(
            r#"
            INSERT INTO group_owners (id, group_id, organization_id, project_id, owner_type, team_id, user_id, date_added)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (group_id) DO UPDATE SET
                owner_type = excluded.owner_type,
                team_id = excluded.team_id,
                user_id = excluded.user_id,
                date_added = excluded.date_added
            RETURNING id, group_id, organization_id, project_id, owner_type, team_id, user_id, date_added
            "#,
        )
        .bind(id)
        .bind(input.group_id)
        .bind(input.organization_id)
        .bind(input.project_id)
        .bind(input.owner_type as i16)
        .bind(input.team_id)
        .bind(input.user_id)
        .bind(date_added)
        .fetch_one(&self.write_pool)
        .await?;

        Self::row_to_owner(&row)
    }

    async fn get_by_group(&self, group_id: Uuid) -> DbResult<Option<GroupOwner>> {
        let row = sqlx::query(
            r#"
            SELECT id, group_id, organization_id, project_id, owner_type, team_id, user_id, date_added
            FROM group_owners
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.read_pool)
        .await?;

        row.as_ref().map(Self::row_to_owner).transpose()
    }

    async fn delete_by_group(&self, group_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM group_owners WHERE group_id = $1")
            .bind(group_id)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
