//! Phase 3: link, build, publish.

use std::time::Duration;

use assetlane_protocol::BearerToken;
use assetlane_protocol::messages::{
    ApiErrorBody, BuildState, CreateAssetRequest, CreateItemRequest, LinkAssetRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::platform::PlatformApi;
use crate::session::{SessionState, UploadSession};
use crate::types::{EventSink, PublishedItem};

/// Commercial terms and pacing of the finalize phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeSettings {
    pub price: u32,
    pub currency: String,
    /// Pause between link and build so the platform can register the asset.
    pub settle_delay_ms: u64,
    /// Pause between build and publish when build status is not polled.
    pub publish_delay_ms: u64,
    /// Poll build status instead of sleeping `publish_delay_ms`.
    pub build_poll: Option<BuildPollSettings>,
}

impl Default for FinalizeSettings {
    fn default() -> Self {
        Self {
            price: 5,
            currency: "ZEM".into(),
            settle_delay_ms: 3_000,
            publish_delay_ms: 2_000,
            build_poll: None,
        }
    }
}

impl FinalizeSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }
}

/// Bounded exponential backoff for build-status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildPollSettings {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for BuildPollSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            max_attempts: 8,
        }
    }
}

impl BuildPollSettings {
    /// Delay before poll number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

/// Runs link, build and publish for a transferred session.
pub struct FinalizePipeline<'a> {
    platform: &'a dyn PlatformApi,
    settings: &'a FinalizeSettings,
    events: EventSink,
}

impl<'a> FinalizePipeline<'a> {
    pub fn new(platform: &'a dyn PlatformApi, settings: &'a FinalizeSettings) -> Self {
        Self {
            platform,
            settings,
            events: EventSink::default(),
        }
    }

    pub(crate) fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Finalizes `session`, which must be in `Transferred`.
    ///
    /// On a fatal error the session is moved to `Failed`.
    pub async fn run(&self, session: &mut UploadSession) -> Result<PublishedItem, UploadError> {
        if session.state() != &SessionState::Transferred {
            return Err(UploadError::InvalidTransition {
                from: session.state().clone(),
                to: SessionState::Linked,
            });
        }

        match self.run_steps(session).await {
            Ok(item) => Ok(item),
            Err(err) => {
                if !session.state().is_terminal() {
                    session.fail(err.to_string())?;
                    self.events.state_changed(session);
                }
                Err(err)
            }
        }
    }

    async fn run_steps(&self, session: &mut UploadSession) -> Result<PublishedItem, UploadError> {
        let token = session
            .token()
            .cloned()
            .ok_or_else(|| UploadError::Auth("session has no token".into()))?;
        let transfer_id = session
            .target()
            .map(|t| t.transfer_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| UploadError::InvalidFile("session has no transfer id".into()))?;
        let category_id = session.category_id().to_string();

        let asset_id = self
            .link(&transfer_id, &category_id, &session.file().name, &token)
            .await?;
        info!(session = %session.id(), asset = %asset_id, "asset linked");
        session.linked(asset_id.clone())?;
        self.events.state_changed(session);

        tokio::time::sleep(self.settings.settle_delay()).await;
        let confirmed = self.build(&asset_id, &category_id, &token).await;
        session.built(confirmed)?;
        self.events.state_changed(session);

        self.publish(&asset_id, &category_id, &token).await?;
        session.published()?;
        self.events.state_changed(session);
        info!(session = %session.id(), asset = %asset_id, "item published");

        Ok(PublishedItem {
            session_id: session.id(),
            asset_id,
            category_id,
            build_confirmed: confirmed,
        })
    }

    /// Links the transferred file, falling back to one asset create.
    async fn link(
        &self,
        transfer_id: &str,
        category_id: &str,
        name: &str,
        token: &BearerToken,
    ) -> Result<String, UploadError> {
        let req = LinkAssetRequest {
            category_id: category_id.into(),
            file_id: transfer_id.into(),
            name: name.into(),
        };
        let link_error = match self.platform.link_asset(&req, token).await {
            Ok(created) if !created.id.is_empty() => return Ok(created.id),
            Ok(_) => "link returned an empty asset id".to_string(),
            Err(e) => e.to_string(),
        };
        warn!(error = %link_error, "asset link rejected, trying asset create");

        let req = CreateAssetRequest {
            category_id: category_id.into(),
            name: name.into(),
            file_id: transfer_id.into(),
        };
        let fallback_error = match self.platform.create_asset(&req, token).await {
            Ok(created) if !created.id.is_empty() => return Ok(created.id),
            Ok(_) => "create returned an empty asset id".to_string(),
            Err(e) => e.to_string(),
        };

        Err(UploadError::Link {
            link_error,
            fallback_error,
        })
    }

    /// Triggers the build and waits for it. Never fails the pipeline.
    ///
    /// Returns `true` if the build was accepted and not reported failed.
    async fn build(&self, asset_id: &str, category_id: &str, token: &BearerToken) -> bool {
        if let Err(e) = self
            .platform
            .trigger_build(asset_id, category_id, token)
            .await
        {
            warn!(asset = asset_id, error = %e, "build trigger failed, publishing anyway");
            tokio::time::sleep(self.settings.publish_delay()).await;
            return false;
        }

        match &self.settings.build_poll {
            Some(poll) if self.platform.supports_build_status() => {
                self.poll_build(poll, asset_id, category_id, token).await
            }
            _ => {
                tokio::time::sleep(self.settings.publish_delay()).await;
                true
            }
        }
    }

    async fn poll_build(
        &self,
        poll: &BuildPollSettings,
        asset_id: &str,
        category_id: &str,
        token: &BearerToken,
    ) -> bool {
        for attempt in 0..poll.max_attempts {
            tokio::time::sleep(poll.backoff(attempt)).await;
            match self
                .platform
                .build_status(asset_id, category_id, token)
                .await
            {
                Ok(resp) => match resp.state() {
                    BuildState::Ready => {
                        debug!(asset = asset_id, attempt, "build ready");
                        return true;
                    }
                    BuildState::Failed(reason) => {
                        warn!(asset = asset_id, reason = %reason, "build reported failure");
                        return false;
                    }
                    BuildState::Pending => {}
                },
                Err(e) => {
                    warn!(asset = asset_id, error = %e, "build status check failed");
                    return false;
                }
            }
        }
        warn!(
            asset = asset_id,
            attempts = poll.max_attempts,
            "build still pending, publishing anyway"
        );
        false
    }

    async fn publish(
        &self,
        asset_id: &str,
        category_id: &str,
        token: &BearerToken,
    ) -> Result<(), UploadError> {
        let req = CreateItemRequest {
            price: self.settings.price,
            asset_id: asset_id.into(),
            category_id: category_id.into(),
            currency: self.settings.currency.clone(),
        };
        self.platform
            .create_item(&req, token)
            .await
            .map_err(|e| match &e {
                assetlane_platform::Error::Api { body, .. } => UploadError::Publish(
                    ApiErrorBody::message_from(body).unwrap_or_else(|| e.to_string()),
                ),
                _ => UploadError::Publish(e.to_string()),
            })
    }
}
