use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub slug: String,
    pub name: String,
    /// SDK platform reported at creation (e.g. "python", "javascript").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub organization_id: Uuid,
    pub slug: String,
    pub name: String,
    pub platform: Option<String>,
}

/// A client key for a project. The public half is embedded in DSNs handed
/// to SDKs; the secret half never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectKey {
    pub id: Uuid,
    pub project_id: Uuid,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProjectKey {
    pub project_id: Uuid,
    pub label: Option<String>,
}

impl ProjectKey {
    /// Public DSN for this key: `scheme://public_key@host[:port]/project_id`.
    ///
    /// Returns None when the base URL cannot carry credentials (e.g. a
    /// cannot-be-a-base URL).
    pub fn dsn(&self, base_url: &Url) -> Option<Url> {
        let mut url = base_url.clone();
        url.set_username(&self.public_key).ok()?;
        url.set_path(&format!("/{}", self.project_id));
        url.set_query(None);
        url.set_fragment(None);
        Some(url)
    }
}
