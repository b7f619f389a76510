//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the platform API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL every relative path is joined onto.
    pub base_url: String,

    /// `User-Agent` header. Defaults to `assetlane/<version>`.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for metadata calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub paths: ApiPaths,
}

/// Endpoint paths, relative to [`PlatformConfig::base_url`].
///
/// `{asset_id}` and `{category_id}` are substituted with percent-encoded
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPaths {
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_link")]
    pub link_asset: String,
    #[serde(default = "default_create_asset")]
    pub create_asset: String,
    #[serde(default = "default_build")]
    pub build: String,
    /// Optional build-status endpoint (GET). Polling is disabled without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_status: Option<String>,
    #[serde(default = "default_create_item")]
    pub create_item: String,
}

fn default_user_agent() -> String {
    concat!("assetlane/", env!("CARGO_PKG_VERSION")).into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_login() -> String {
    "/api/authenticate".into()
}

fn default_link() -> String {
    "/api/assets/link".into()
}

fn default_create_asset() -> String {
    "/api/assets".into()
}

fn default_build() -> String {
    "/api/assets/{asset_id}/build/{category_id}".into()
}

fn default_create_item() -> String {
    "/api/items".into()
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            login: default_login(),
            link_asset: default_link(),
            create_asset: default_create_asset(),
            build: default_build(),
            build_status: None,
            create_item: default_create_item(),
        }
    }
}

impl PlatformConfig {
    /// Config with default paths and timeouts for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            paths: ApiPaths::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
