use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// Debug view configuration.
///
/// When present, `/debug/embed/error-page` is mounted and renders the
/// error-page widget against this project's DSN. Intended for local
/// development and demo deployments, not production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Slug of the organization that owns the debug project.
    pub organization: String,

    /// Slug of the project whose first active key becomes the embed DSN.
    pub project: String,

    /// Public base URL of this deployment, used as the DSN host.
    pub public_base_url: Url,
}

impl DebugConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization.is_empty() || self.project.is_empty() {
            return Err(ConfigError::Validation(
                "debug.organization and debug.project must be non-empty slugs".into(),
            ));
        }
        if !matches!(self.public_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "debug.public_base_url must be an http(s) URL, got '{}'",
                self.public_base_url
            )));
        }
        if self.public_base_url.host_str().is_none() {
            return Err(ConfigError::Validation(
                "debug.public_base_url must include a host".into(),
            ));
        }
        Ok(())
    }
}
