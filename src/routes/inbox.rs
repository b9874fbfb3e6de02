//! Triage API: project inbox listings and per-group inbox/owner records.
//!
//! Nested under `/api/0` by `build_app`. These routes expose the storage
//! surface the issue-stream UI consumes; event ingestion and grouping happen
//! upstream and are not part of this service.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::{
    AppState,
    db::repos::{Cursor, ListParams},
    models::{GroupInbox, GroupOwner, GroupOwnerType, UpsertGroupOwner},
};

/// Query parameters for inbox listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Maximum number of records to return (default 100)
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
}

/// Pagination metadata for cursor-paged listings.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Maximum number of records returned per page.
    pub limit: i64,
    /// Whether there are more records available after this page.
    pub has_more: bool,
    /// Cursor for fetching the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Response for the project inbox listing.
#[derive(Debug, Serialize)]
pub struct InboxListResponse {
    /// Inbox rows, newest first
    pub data: Vec<GroupInbox>,
    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Request body for setting a group's owner attribution.
#[derive(Debug, Deserialize)]
pub struct SetOwnerRequest {
    pub owner_type: GroupOwnerType,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// Routes nested under `/api/0`.
pub fn inbox_routes() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/projects/{org_slug}/{project_slug}/inbox",
            get(list_project_inbox),
        )
        .route("/groups/{group_id}/inbox", get(get_group_inbox))
        .route(
            "/groups/{group_id}/owner",
            get(get_group_owner)
                .put(put_group_owner)
                .delete(delete_group_owner),
        )
}

/// List a project's inbox, newest first.
#[tracing::instrument(name = "api.inbox.list", skip(state, query), fields(%org_slug, %project_slug))]
pub async fn list_project_inbox(
    State(state): State<AppState>,
    Path((org_slug, project_slug)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<InboxListResponse>, ApiError> {
    let org = state
        .db
        .organizations()
        .get_by_slug(&org_slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Organization '{}' not found", org_slug)))?;

    let project = state
        .db
        .projects()
        .get_by_slug(org.id, &project_slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found", project_slug)))?;

    let cursor = query
        .cursor
        .as_deref()
        .map(Cursor::decode)
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid cursor".to_string()))?;

    let limit = query.limit.unwrap_or(100);
    let result = state
        .db
        .group_inbox()
        .list_by_project(
            project.id,
            ListParams {
                limit: query.limit,
                cursor,
            },
        )
        .await?;

    Ok(Json(InboxListResponse {
        data: result.items,
        pagination: PaginationMeta {
            limit,
            has_more: result.has_more,
            next_cursor: result.next_cursor.map(|c| c.encode()),
        },
    }))
}

/// Fetch a single group's inbox row.
#[tracing::instrument(name = "api.inbox.get", skip(state), fields(%group_id))]
pub async fn get_group_inbox(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupInbox>, ApiError> {
    // Look the group up first so an unknown group and a group that is simply
    // not in the inbox produce different messages.
    let group = state
        .db
        .groups()
        .get_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' not found", group_id)))?;

    let inbox = state
        .db
        .group_inbox()
        .get_by_group(group.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' is not in the inbox", group_id)))?;

    Ok(Json(inbox))
}

/// Fetch a group's owner attribution.
#[tracing::instrument(name = "api.owner.get", skip(state), fields(%group_id))]
pub async fn get_group_owner(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupOwner>, ApiError> {
    let group = state
        .db
        .groups()
        .get_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' not found", group_id)))?;

    let owner = state
        .db
        .group_owners()
        .get_by_group(group.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' has no owner", group_id)))?;

    Ok(Json(owner))
}

/// Set or replace a group's owner attribution.
///
/// Exactly one of `team_id` / `user_id` must be set; organization and project
/// are derived from the group, not the request.
#[tracing::instrument(name = "api.owner.put", skip(state, payload), fields(%group_id))]
pub async fn put_group_owner(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<SetOwnerRequest>,
) -> Result<Json<GroupOwner>, ApiError> {
    if payload.team_id.is_some() == payload.user_id.is_some() {
        return Err(ApiError::Validation(
            "Exactly one of team_id or user_id must be set".to_string(),
        ));
    }

    let group = state
        .db
        .groups()
        .get_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' not found", group_id)))?;

    let project = state
        .db
        .projects()
        .get_by_id(group.project_id)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(format!("Project missing for group '{}'", group.id))
        })?;

    let owner = state
        .db
        .group_owners()
        .upsert(UpsertGroupOwner {
            group_id: group.id,
            organization_id: project.organization_id,
            project_id: project.id,
            owner_type: payload.owner_type,
            team_id: payload.team_id,
            user_id: payload.user_id,
        })
        .await?;

    Ok(Json(owner))
}

/// Clear a group's owner attribution.
#[tracing::instrument(name = "api.owner.delete", skip(state), fields(%group_id))]
pub async fn delete_group_owner(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let group = state
        .db
        .groups()
        .get_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' not found", group_id)))?;

    let removed = state.db.group_owners().delete_by_group(group.id).await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Group '{}' has no owner",
            group_id
        )))
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use axum::{Router, body::Body, http::Request};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::models::{
        AddGroupInbox, CreateGroup, CreateOrganization, CreateProject, Group, InboxReason, Project,
    };

    /// Create a test application backed by a fresh in-memory database
    async fn test_app() -> (Router, crate::AppState) {
        use std::sync::atomic::{AtomicU64, Ordering};

        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let db_id = COUNTER.fetch_add(1, Ordering::SeqCst);

        let config_str = format!(
            r#"
[database]
type = "sqlite"
path = "file:test_inbox_db_{}?mode=memory&cache=shared"
create_if_missing = true
run_migrations = true
wal_mode = false
busy_timeout_ms = 5000
"#,
            db_id
        );

        let config = crate::config::VigilConfig::from_str(&config_str)
            .expect("Failed to parse test config");
        let state = crate::AppState::new(config.clone())
            .await
            .expect("Failed to create AppState");
        let app = crate::build_app(&config, state.clone());
        (app, state)
    }

    async fn seed_project(state: &crate::AppState, org_slug: &str, project_slug: &str) -> Project {
        let org = state
            .db
            .organizations()
            .create(CreateOrganization {
                slug: org_slug.to_string(),
                name: org_slug.to_string(),
            })
            .await
            .expect("create org");
        state
            .db
            .projects()
            .create(CreateProject {
                organization_id: org.id,
                slug: project_slug.to_string(),
                name: project_slug.to_string(),
                platform: Some("python".to_string()),
            })
            .await
            .expect("create project")
    }

    async fn seed_group(state: &crate::AppState, project_id: Uuid, title: &str) -> Group {
        state
            .db
            .groups()
            .create(CreateGroup {
                project_id,
                title: title.to_string(),
                culprit: None,
                level: None,
            })
            .await
            .expect("create group")
    }

    /// Seed one group plus its inbox row, `age_minutes` in the past.
    async fn seed_inbox_row(
        state: &crate::AppState,
        project_id: Uuid,
        title: &str,
        age_minutes: i64,
    ) -> GroupInbox {
        let group = seed_group(state, project_id, title).await;
        state
            .db
            .group_inbox()
            .add(AddGroupInbox {
                group_id: group.id,
                project_id,
                reason: InboxReason::New,
                reason_details: None,
                date_added: Utc::now() - chrono::Duration::minutes(age_minutes),
            })
            .await
            .expect("add inbox row")
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    // ============================================================================
    // Project Inbox Listing Tests
    // ============================================================================

    #[tokio::test]
    async fn test_list_inbox_empty() {
        let (app, state) = test_app().await;
        seed_project(&state, "acme", "storefront").await;

        let (status, body) = get_json(&app, "/api/0/projects/acme/storefront/inbox").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["has_more"], false);
        assert!(body["pagination"]["next_cursor"].is_null());
    }

    #[tokio::test]
    async fn test_list_inbox_orders_newest_first() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        seed_inbox_row(&state, project.id, "oldest", 30).await;
        seed_inbox_row(&state, project.id, "middle", 20).await;
        let newest = seed_inbox_row(&state, project.id, "newest", 10).await;

        let (status, body) = get_json(&app, "/api/0/projects/acme/storefront/inbox").await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["id"], newest.id.to_string());
        assert_eq!(data[0]["reason"], "new");
    }

    #[tokio::test]
    async fn test_list_inbox_paginates_with_cursor() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        for i in 0..5 {
            seed_inbox_row(&state, project.id, &format!("error {}", i), (i + 1) * 10).await;
        }

        let mut seen = Vec::new();
        let mut uri = "/api/0/projects/acme/storefront/inbox?limit=2".to_string();
        loop {
            let (status, body) = get_json(&app, &uri).await;
            assert_eq!(status, StatusCode::OK);
            for item in body["data"].as_array().unwrap() {
                seen.push(item["id"].as_str().unwrap().to_string());
            }
            if !body["pagination"]["has_more"].as_bool().unwrap() {
                break;
            }
            let next = body["pagination"]["next_cursor"].as_str().unwrap();
            uri = format!("/api/0/projects/acme/storefront/inbox?limit=2&cursor={}", next);
        }

        assert_eq!(seen.len(), 5);
        let unique: std::collections::HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 5, "pages must not overlap");
    }

    #[tokio::test]
    async fn test_list_inbox_scoped_to_project() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let other = seed_project(&state, "globex", "billing").await;
        seed_inbox_row(&state, project.id, "ours", 10).await;
        seed_inbox_row(&state, other.id, "theirs", 5).await;

        let (status, body) = get_json(&app, "/api/0/projects/acme/storefront/inbox").await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["project_id"], project.id.to_string());
    }

    #[tokio::test]
    async fn test_list_inbox_unknown_org_returns_404() {
        let (app, _state) = test_app().await;

        let (status, body) = get_json(&app, "/api/0/projects/nope/storefront/inbox").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Organization")
        );
    }

    #[tokio::test]
    async fn test_list_inbox_unknown_project_returns_404() {
        let (app, state) = test_app().await;
        seed_project(&state, "acme", "storefront").await;

        let (status, body) = get_json(&app, "/api/0/projects/acme/nope/inbox").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Project")
        );
    }

    #[tokio::test]
    async fn test_list_inbox_invalid_cursor_returns_400() {
        let (app, state) = test_app().await;
        seed_project(&state, "acme", "storefront").await;

        let (status, body) =
            get_json(&app, "/api/0/projects/acme/storefront/inbox?cursor=!!bogus!!").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "bad_request");
    }

    // ============================================================================
    // Group Inbox Tests
    // ============================================================================

    #[tokio::test]
    async fn test_get_group_inbox() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let row = seed_inbox_row(&state, project.id, "NullPointerException", 10).await;

        let (status, body) = get_json(&app, &format!("/api/0/groups/{}/inbox", row.group_id)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], row.id.to_string());
        assert_eq!(body["group_id"], row.group_id.to_string());
        assert_eq!(body["reason"], "new");
    }

    #[tokio::test]
    async fn test_get_group_inbox_unknown_group_returns_404() {
        let (app, _state) = test_app().await;

        let (status, body) =
            get_json(&app, &format!("/api/0/groups/{}/inbox", Uuid::new_v4())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"]["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_get_group_inbox_not_in_inbox_returns_404() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "quiet group").await;

        let (status, body) = get_json(&app, &format!("/api/0/groups/{}/inbox", group.id)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("not in the inbox")
        );
    }

    // ============================================================================
    // Group Owner Tests
    // ============================================================================

    #[tokio::test]
    async fn test_put_owner_with_team() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "owned group").await;
        let team_id = Uuid::new_v4();

        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/0/groups/{}/owner", group.id),
            Some(json!({"owner_type": "ownership_rule", "team_id": team_id})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["group_id"], group.id.to_string());
        assert_eq!(body["owner_type"], "ownership_rule");
        assert_eq!(body["team_id"], team_id.to_string());
        assert!(body["user_id"].is_null());
        // Derived from the group, not the request
        assert_eq!(body["project_id"], project.id.to_string());
        assert_eq!(body["organization_id"], project.organization_id.to_string());
    }

    #[tokio::test]
    async fn test_put_owner_requires_exactly_one_target() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "owned group").await;
        let uri = format!("/api/0/groups/{}/owner", group.id);

        // Both set
        let (status, body) = send_json(
            &app,
            "PUT",
            &uri,
            Some(json!({
                "owner_type": "suspect_commit",
                "team_id": Uuid::new_v4(),
                "user_id": Uuid::new_v4(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");

        // Neither set
        let (status, _) = send_json(
            &app,
            "PUT",
            &uri,
            Some(json!({"owner_type": "suspect_commit"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_put_owner_replaces_previous() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "owned group").await;
        let uri = format!("/api/0/groups/{}/owner", group.id);
        let user_id = Uuid::new_v4();

        let (status, _) = send_json(
            &app,
            "PUT",
            &uri,
            Some(json!({"owner_type": "ownership_rule", "team_id": Uuid::new_v4()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(
            &app,
            "PUT",
            &uri,
            Some(json!({"owner_type": "suspect_commit", "user_id": user_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["owner_type"], "suspect_commit");
        assert_eq!(body["user_id"], user_id.to_string());
        assert!(body["team_id"].is_null());

        // GET reflects the replacement
        let (status, body) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], user_id.to_string());
    }

    #[tokio::test]
    async fn test_get_owner_without_owner_returns_404() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "unowned group").await;

        let (status, body) = get_json(&app, &format!("/api/0/groups/{}/owner", group.id)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"]["message"].as_str().unwrap().contains("no owner"));
    }

    #[tokio::test]
    async fn test_delete_owner() {
        let (app, state) = test_app().await;
        let project = seed_project(&state, "acme", "storefront").await;
        let group = seed_group(&state, project.id, "owned group").await;
        let uri = format!("/api/0/groups/{}/owner", group.id);

        let (status, _) = send_json(
            &app,
            "PUT",
            &uri,
            Some(json!({"owner_type": "ownership_rule", "team_id": Uuid::new_v4()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Second delete finds nothing
        let (status, _) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
