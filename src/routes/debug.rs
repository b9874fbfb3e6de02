//! Debug view that renders the error-page widget embed.
//!
//! Mounted only when a `[debug]` project is configured. The page resolves the
//! debug project's first active DSN key and loads the embed script with a
//! fixed sample event id, so the widget can be exercised without ingesting a
//! real event.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    response::Html,
};

use super::error::ApiError;
use crate::AppState;

/// Sample event id baked into the embed page.
const DEBUG_EVENT_ID: &str = "342a3d7f690a49f8bd7c4cf0e61a9ded";

/// Render the error-page embed against the configured debug project.
#[tracing::instrument(name = "debug.error_page_embed", skip(state, params))]
pub async fn error_page_embed(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let debug = state
        .config
        .debug
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Debug view is not configured".to_string()))?;

    let org = state
        .db
        .organizations()
        .get_by_slug(&debug.organization)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Organization '{}' not found", debug.organization))
        })?;

    let project = state
        .db
        .projects()
        .get_by_slug(org.id, &debug.project)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project '{}' not found", debug.project)))?;

    let key = state
        .db
        .projects()
        .first_key(project.id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Project '{}' has no active keys", debug.project))
        })?;

    let dsn = key.dsn(&debug.public_base_url).ok_or_else(|| {
        ApiError::Internal("Debug DSN could not be built from public_base_url".to_string())
    })?;

    let options = serde_json::to_string(&params)
        .map_err(|e| ApiError::Internal(format!("Failed to encode embed options: {e}")))?;

    let mut script_url = debug
        .public_base_url
        .join("/api/embed/error-page/")
        .map_err(|e| ApiError::Internal(format!("Failed to build embed script URL: {e}")))?;
    script_url
        .query_pairs_mut()
        .append_pair("dsn", dsn.as_str())
        .append_pair("event_id", DEBUG_EVENT_ID)
        .append_pair("options", &options)
        .finish();

    // '&' between query pairs has to become '&amp;' inside the attribute.
    let page = format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Error page embed</title>
  </head>
  <body>
    <script src="{}" async></script>
  </body>
</html>
"#,
        script_url.as_str().replace('&', "&amp;")
    );

    Ok(Html(page))
}
