//! Platform API client.
//!
//! Async HTTP client using `reqwest`. Login is the only unauthenticated
//! call; every other request takes the session's [`BearerToken`].

use assetlane_protocol::messages::{
    AssetCreated, BuildStatusResponse, CreateAssetRequest, CreateItemRequest, LinkAssetRequest,
    LoginRequest, LoginResponse,
};
use assetlane_protocol::{BearerToken, Credentials};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder};
use tracing::debug;

use crate::config::PlatformConfig;

/// Characters left untouched when substituting ids into path templates.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors from the platform client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("response is missing {0}")]
    MissingField(&'static str),

    #[error("{0} endpoint is not configured")]
    Unsupported(&'static str),
}

impl Error {
    /// HTTP status code, if the platform answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for transport-level timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Platform API client.
pub struct Client {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl Client {
    /// Creates a new client.
    pub fn new(config: PlatformConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Returns `true` if a build-status endpoint is configured.
    pub fn supports_build_status(&self) -> bool {
        self.config.paths.build_status.is_some()
    }

    /// Exchanges credentials for a bearer token and profile.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let req = LoginRequest {
            login_id: &credentials.login_id,
            password: &credentials.password,
        };
        let url = self.url(&self.config.paths.login);
        let body = self
            .execute(self.http.post(&url).json(&req))
            .await?;

        let resp: LoginResponse = serde_json::from_slice(&body)?;
        if resp.auth_token.trim().is_empty() {
            return Err(Error::MissingField("authToken"));
        }
        Ok(resp)
    }

    /// Posts an upload-initiation payload and returns the raw JSON body.
    ///
    /// `endpoint` may be absolute or relative to the base URL. Deciding
    /// whether the body carries a usable target is left to the caller.
    pub async fn create_transfer_target(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        token: &BearerToken,
    ) -> Result<serde_json::Value, Error> {
        let url = self.url(endpoint);
        let body = self
            .execute(self.authorized(Method::POST, &url, token)?.json(payload))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Links a transferred file to a category, returning the asset id.
    pub async fn link_asset(
        &self,
        req: &LinkAssetRequest,
        token: &BearerToken,
    ) -> Result<AssetCreated, Error> {
        let url = self.url(&self.config.paths.link_asset);
        let body = self
            .execute(self.authorized(Method::POST, &url, token)?.json(req))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Creates an asset record referencing an already-transferred file.
    pub async fn create_asset(
        &self,
        req: &CreateAssetRequest,
        token: &BearerToken,
    ) -> Result<AssetCreated, Error> {
        let url = self.url(&self.config.paths.create_asset);
        let body = self
            .execute(self.authorized(Method::POST, &url, token)?.json(req))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Triggers the asynchronous build/validation of an asset.
    pub async fn trigger_build(
        &self,
        asset_id: &str,
        category_id: &str,
        token: &BearerToken,
    ) -> Result<(), Error> {
        let url = self.url(&fill_path(&self.config.paths.build, asset_id, category_id));
        self.execute(self.authorized(Method::POST, &url, token)?)
            .await?;
        Ok(())
    }

    /// Reads the build status of an asset.
    pub async fn build_status(
        &self,
        asset_id: &str,
        category_id: &str,
        token: &BearerToken,
    ) -> Result<BuildStatusResponse, Error> {
        let template = self
            .config
            .paths
            .build_status
            .as_deref()
            .ok_or(Error::Unsupported("build status"))?;
        let url = self.url(&fill_path(template, asset_id, category_id));
        let body = self
            .execute(self.authorized(Method::GET, &url, token)?)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Creates the sellable catalog item.
    pub async fn create_item(
        &self,
        req: &CreateItemRequest,
        token: &BearerToken,
    ) -> Result<(), Error> {
        let url = self.url(&self.config.paths.create_item);
        self.execute(self.authorized(Method::POST, &url, token)?.json(req))
            .await?;
        Ok(())
    }

    fn authorized(
        &self,
        method: Method,
        url: &str,
        token: &BearerToken,
    ) -> Result<RequestBuilder, Error> {
        let value = HeaderValue::from_str(&token.header_value()).map_err(|_| Error::InvalidToken)?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, value))
    }

    /// Sends a request and returns the body of a successful response.
    async fn execute(&self, req: RequestBuilder) -> Result<Vec<u8>, Error> {
        let resp = req.send().await?;
        let status = resp.status();
        debug!(url = %resp.url(), status = status.as_u16(), "platform response");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Substitutes `{asset_id}` and `{category_id}` into a path template.
fn fill_path(template: &str, asset_id: &str, category_id: &str) -> String {
    template
        .replace(
            "{asset_id}",
            &utf8_percent_encode(asset_id, PATH_SEGMENT).to_string(),
        )
        .replace(
            "{category_id}",
            &utf8_percent_encode(category_id, PATH_SEGMENT).to_string(),
        )
}
