//! Scripted platform used by the engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use assetlane_platform::Error;
use assetlane_protocol::messages::{
    AssetCreated, BuildStatusResponse, CreateAssetRequest, CreateItemRequest, LinkAssetRequest,
    LoginResponse,
};
use assetlane_protocol::{BearerToken, Credentials, EndpointCandidate, Profile};
use serde_json::Value;

use crate::platform::{BoxFuture, PlatformApi};

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login(String),
    CreateTarget {
        endpoint: String,
        payload: Value,
        token: String,
    },
    Link(LinkAssetRequest),
    CreateAsset(CreateAssetRequest),
    Build {
        asset_id: String,
        category_id: String,
    },
    BuildStatus,
    CreateItem(CreateItemRequest),
}

/// Scripted reply for a create-transfer-target call.
pub enum TargetReply {
    Json(Value),
    Status(u16, &'static str),
    Hang,
}

pub fn api_error(status: u16, body: &str) -> Error {
    Error::Api {
        status,
        body: body.into(),
    }
}

/// Records every call and replies from per-operation queues.
///
/// Empty queues fall back to success, except discovery which answers 404.
#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<Call>>,
    logins: Mutex<VecDeque<Result<String, Error>>>,
    targets: Mutex<VecDeque<TargetReply>>,
    links: Mutex<VecDeque<Result<String, Error>>>,
    creates: Mutex<VecDeque<Result<String, Error>>>,
    builds: Mutex<VecDeque<Result<(), Error>>>,
    statuses: Mutex<VecDeque<Result<&'static str, Error>>>,
    items: Mutex<VecDeque<Result<(), Error>>>,
    build_status_supported: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform that also answers build-status queries.
    pub fn with_build_status() -> Self {
        Self {
            build_status_supported: true,
            ..Self::default()
        }
    }

    pub fn push_login(&self, reply: Result<&str, Error>) {
        self.logins
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
    }

    pub fn push_target(&self, reply: TargetReply) {
        self.targets.lock().unwrap().push_back(reply);
    }

    pub fn push_link(&self, reply: Result<&str, Error>) {
        self.links
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
    }

    pub fn push_create(&self, reply: Result<&str, Error>) {
        self.creates
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
    }

    pub fn push_build(&self, reply: Result<(), Error>) {
        self.builds.lock().unwrap().push_back(reply);
    }

    pub fn push_status(&self, reply: Result<&'static str, Error>) {
        self.statuses.lock().unwrap().push_back(reply);
    }

    pub fn push_item(&self, reply: Result<(), Error>) {
        self.items.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Endpoint ids of create-transfer-target calls, in order.
    pub fn target_endpoints(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateTarget { endpoint, .. } => Some(endpoint),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlatformApi for MockPlatform {
    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<LoginResponse, Error>> {
        self.record(Call::Login(credentials.login_id.clone()));
        let reply = self
            .logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("tok".into()));
        Box::pin(async move {
            reply.map(|token| LoginResponse {
                auth_token: token,
                profile: Profile {
                    name: "Owner".into(),
                    user_id: "owner01".into(),
                    image_url: String::new(),
                },
            })
        })
    }

    fn create_transfer_target<'a>(
        &'a self,
        candidate: &'a EndpointCandidate,
        payload: &'a Value,
        token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<Value, Error>> {
        self.record(Call::CreateTarget {
            endpoint: candidate.id().to_string(),
            payload: payload.clone(),
            token: token.as_str().to_string(),
        });
        let reply = self
            .targets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TargetReply::Status(404, "not found"));
        Box::pin(async move {
            match reply {
                TargetReply::Json(v) => Ok(v),
                TargetReply::Status(status, body) => Err(api_error(status, body)),
                TargetReply::Hang => std::future::pending().await,
            }
        })
    }

    fn link_asset<'a>(
        &'a self,
        req: &'a LinkAssetRequest,
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>> {
        self.record(Call::Link(req.clone()));
        let reply = self
            .links
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("asset-1".into()));
        Box::pin(async move { reply.map(|id| AssetCreated { id }) })
    }

    fn create_asset<'a>(
        &'a self,
        req: &'a CreateAssetRequest,
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<AssetCreated, Error>> {
        self.record(Call::CreateAsset(req.clone()));
        let reply = self
            .creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("asset-fallback".into()));
        Box::pin(async move { reply.map(|id| AssetCreated { id }) })
    }

    fn trigger_build<'a>(
        &'a self,
        asset_id: &'a str,
        category_id: &'a str,
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>> {
        self.record(Call::Build {
            asset_id: asset_id.into(),
            category_id: category_id.into(),
        });
        let reply = self.builds.lock().unwrap().pop_front().unwrap_or(Ok(()));
        Box::pin(async move { reply })
    }

    fn supports_build_status(&self) -> bool {
        self.build_status_supported
    }

    fn build_status<'a>(
        &'a self,
        _asset_id: &'a str,
        _category_id: &'a str,
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<BuildStatusResponse, Error>> {
        self.record(Call::BuildStatus);
        let reply = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok("ready"));
        Box::pin(async move {
            reply.map(|status| BuildStatusResponse {
                status: status.into(),
                message: None,
            })
        })
    }

    fn create_item<'a>(
        &'a self,
        req: &'a CreateItemRequest,
        _token: &'a BearerToken,
    ) -> BoxFuture<'a, Result<(), Error>> {
        self.record(Call::CreateItem(req.clone()));
        let reply = self.items.lock().unwrap().pop_front().unwrap_or(Ok(()));
        Box::pin(async move { reply })
    }
}
