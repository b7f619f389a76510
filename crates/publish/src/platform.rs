//! Platform connection trait.
//!
//! `PlatformApi` is implemented for the reqwest-backed
//! [`assetlane_platform::Client`]. Keeping the engine behind a trait keeps
//! orchestration logic decoupled from HTTP and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use assetlane_platform::{Client, Error};
use assetlane_protocol::messages::{
    AssetCreated, BuildStatusResponse, CreateAssetRequest, CreateItemRequest, LinkAssetRequest,
    LoginResponse,
};
use assetlane_protocol::{BearerToken, Credentials, EndpointCandidate};

/// Boxed `Send` future returned by [`PlatformApi`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Calls the engine makes against the catalog platform.
pub trait PlatformApi: Send + Sync {
    /// Exchanges credentials for a token and profile.
    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<LoginResponse, Error>>;

    /// Issues one candidate's upload-initiation request, returning the raw body.
    fn create_transfer_target<'a>(
        &'a self,
        candidate: &'a EndpointCandidate,
        payload: &'a serde_json::Value,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<serde_json::Value, Error>>;

    fn link_asset<'a>(
        &'a self,
        req: &'a LinkAssetRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>>;

    fn create_asset<'a>(
        &'a self,
        req: &'a CreateAssetRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>>;

    fn trigger_build<'a>(
        &'a self,
        asset_id: &'a str,
        category_id: &'a str,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>>;

    /// Returns `true` if [`build_status`](Self::build_status) can be polled.
    fn supports_build_status(&self) -> bool;

    fn build_status<'a>(
        &'a self,
        asset_id: &'a str,
        category_id: &'a str,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<BuildStatusResponse, Error>>;

    fn create_item<'a>(
        &'a self,
        req: &'a CreateItemRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

impl PlatformApi for Client {
    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<LoginResponse, Error>> {
        Box::pin(Client::login(self, credentials))
    }

    fn create_transfer_target<'a>(
        &'a self,
        candidate: &'a EndpointCandidate,
        payload: &'a serde_json::Value,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<serde_json::Value, Error>> {
        Box::pin(async move {
            let url = candidate.resolve_url(&self.config().base_url);
            Client::create_transfer_target(self, &url, payload, token).await
        })
    }

    fn link_asset<'a>(
        &'a self,
        req: &'a LinkAssetRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>> {
        Box::pin(Client::link_asset(self, req, token))
    }

    fn create_asset<'a>(
        &'a self,
        req: &'a CreateAssetRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>> {
        Box::pin(Client::create_asset(self, req, token))
    }

    fn trigger_build<'a>(
        &'a self,
        asset_id: &'a str,
        category_id: &'a str,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(Client::trigger_build(self, asset_id, category_id, token))
    }

    fn supports_build_status(&self) -> bool {
        Client::supports_build_status(self)
    }

    fn build_status<'a>(
        &'a self,
        asset_id: &'a str,
        category_id: &'a str,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<BuildStatusResponse, Error>> {
        Box::pin(Client::build_status(self, asset_id, category_id, token))
    }

    fn create_item<'a>(
        &'a self,
        req: &'a CreateItemRequest,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(Client::create_item(self, req, token))
    }
}
