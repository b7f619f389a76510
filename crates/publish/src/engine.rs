//! Upload engine: ties accounts, categories, discovery, transfer and
//! finalize together.
//!
//! The engine holds only read-only shared state. Every upload is its own
//! [`UploadSession`], so any number of sessions may run concurrently
//! against one `Arc<UploadEngine>`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assetlane_protocol::{AccountStatus, CategoryMap, EndpointCandidate, FileDescriptor};
use assetlane_transfer::{DirectTransferClient, ProgressCallback, TransferReceipt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::account::AccountStore;
use crate::auth::AuthenticationClient;
use crate::error::UploadError;
use crate::finalize::{FinalizePipeline, FinalizeSettings};
use crate::platform::PlatformApi;
use crate::scanner::EndpointScanner;
use crate::session::{FinalizeRequest, UploadSession};
use crate::types::{AccountCheck, EventSink, FinalizeOutcome, PublishedItem, UploadEvent};

const EVENT_BUFFER: usize = 256;

/// Tunables of the upload pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upload-initiation candidates, tried in order.
    pub candidates: Vec<EndpointCandidate>,
    /// Bound on each candidate attempt.
    pub attempt_timeout_ms: u64,
    pub finalize: FinalizeSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            attempt_timeout_ms: 15_000,
            finalize: FinalizeSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Drives upload sessions for linked accounts.
pub struct UploadEngine {
    platform: Arc<dyn PlatformApi>,
    accounts: Arc<dyn AccountStore>,
    categories: CategoryMap,
    settings: EngineSettings,
    events: EventSink,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl UploadEngine {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        accounts: Arc<dyn AccountStore>,
        categories: CategoryMap,
        settings: EngineSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            platform,
            accounts,
            categories,
            settings,
            events: EventSink::new(tx),
            events_rx: Some(rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Phase 1: authenticates and discovers a transfer target.
    ///
    /// Account and category problems are reported before any network call.
    /// The returned session is in `Discovered`; its
    /// [`ticket`](UploadSession::ticket) carries what phase 2 needs.
    pub async fn prepare(
        &self,
        account_id: &str,
        file_name: &str,
        file_size: u64,
        category: &str,
    ) -> Result<UploadSession, UploadError> {
        if file_name.trim().is_empty() {
            return Err(UploadError::InvalidFile("file name is empty".into()));
        }
        if file_size == 0 {
            return Err(UploadError::InvalidFile(format!("{file_name} is empty")));
        }

        let account = self
            .accounts
            .lookup(account_id)
            .map_err(|e| UploadError::AccountNotReady {
                account_id: account_id.into(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| UploadError::AccountNotReady {
                account_id: account_id.into(),
                reason: "account not found".into(),
            })?;
        if !account.is_connected() {
            return Err(UploadError::AccountNotReady {
                account_id: account_id.into(),
                reason: format!("status is {}", account.status),
            });
        }

        let category_id = self
            .categories
            .resolve(category)
            .ok_or_else(|| UploadError::UnknownCategory(category.into()))?
            .to_string();

        let mut session = UploadSession::new(
            account_id,
            FileDescriptor::new(file_name, file_size),
            category,
            category_id,
        );
        self.events.state_changed(&session);
        info!(session = %session.id(), account = account_id, file = file_name, "upload session started");

        match self.authenticate_and_discover(&mut session, &account).await {
            Ok(()) => Ok(session),
            Err(e) => Err(self.fail(&mut session, e)),
        }
    }

    async fn authenticate_and_discover(
        &self,
        session: &mut UploadSession,
        account: &assetlane_protocol::LinkedAccount,
    ) -> Result<(), UploadError> {
        let token = AuthenticationClient::new(self.platform.as_ref())
            .authenticate(account)
            .await?;
        session.authenticated(token.clone())?;
        self.events.state_changed(session);

        let target = EndpointScanner::new(self.platform.as_ref(), self.settings.attempt_timeout())
            .with_events(self.events.clone(), session.id())
            .discover(&self.settings.candidates, session.file(), &token)
            .await?;
        session.discovered(target)?;
        self.events.state_changed(session);
        Ok(())
    }

    /// Phase 2 performed in-process: streams `path` to the session's URL.
    pub async fn transfer(
        &self,
        session: &mut UploadSession,
        client: &DirectTransferClient,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TransferReceipt, UploadError> {
        let upload_url = match session.target() {
            Some(target) if !target.upload_url.is_empty() => target.upload_url.clone(),
            _ => {
                return Err(UploadError::InvalidTransition {
                    from: session.state().clone(),
                    to: crate::session::SessionState::Transferred,
                });
            }
        };

        let events = self.events.clone();
        let session_id = session.id();
        let progress: ProgressCallback = Box::new(move |p| {
            events.emit(UploadEvent::TransferProgress {
                session_id,
                bytes_sent: p.bytes_sent,
                total_bytes: p.total_bytes,
            });
        });

        match client
            .transfer_file(&upload_url, path, cancel, Some(progress))
            .await
        {
            Ok(receipt) => {
                session.transferred()?;
                self.events.state_changed(session);
                info!(session = %session_id, bytes = receipt.bytes_sent, "transfer complete");
                Ok(receipt)
            }
            Err(e) => Err(self.fail(session, e.into())),
        }
    }

    /// Phase 3 for a session that is in `Transferred`.
    pub async fn finalize(&self, session: &mut UploadSession) -> Result<PublishedItem, UploadError> {
        let result = FinalizePipeline::new(self.platform.as_ref(), &self.settings.finalize)
            .with_events(self.events.clone())
            .run(session)
            .await;
        if let Err(e) = &result {
            error!(session = %session.id(), error = %e, "finalize failed");
        }
        result
    }

    /// Phase 3 for a caller that performed the transfer itself.
    ///
    /// Blank ids or tokens are rejected before any network call.
    pub async fn finalize_ticket(&self, req: FinalizeRequest) -> FinalizeOutcome {
        if let Err(e) = req.validate() {
            error!(error = %e, "finalize request rejected");
            return FinalizeOutcome::from(Err::<PublishedItem, _>(e));
        }
        let mut session = UploadSession::resume(req);
        self.events.state_changed(&session);
        self.finalize(&mut session).await.into()
    }

    /// Runs all three phases for a file on disk.
    pub async fn publish(
        &self,
        account_id: &str,
        path: &Path,
        category: &str,
        client: &DirectTransferClient,
        cancel: &CancellationToken,
    ) -> Result<PublishedItem, UploadError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::InvalidFile(format!("{} has no file name", path.display())))?;
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::InvalidFile(format!("{}: {e}", path.display())))?
            .len();

        let mut session = self.prepare(account_id, file_name, size, category).await?;
        self.transfer(&mut session, client, path, cancel).await?;
        self.finalize(&mut session).await
    }

    /// Verifies an account's stored credentials with a fresh login.
    ///
    /// Works for accounts in any status. The resulting status is reported,
    /// not stored.
    pub async fn check_account(&self, account_id: &str) -> Result<AccountCheck, UploadError> {
        let account = self
            .accounts
            .lookup(account_id)
            .map_err(|e| UploadError::AccountNotReady {
                account_id: account_id.into(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| UploadError::AccountNotReady {
                account_id: account_id.into(),
                reason: "account not found".into(),
            })?;

        let check = match AuthenticationClient::new(self.platform.as_ref())
            .login(&account.credentials)
            .await
        {
            Ok(outcome) => AccountCheck {
                account_id: account.id,
                status: AccountStatus::Connected,
                message: format!("signed in as {}", outcome.profile.name),
                profile: Some(outcome.profile),
            },
            Err(e) => AccountCheck {
                account_id: account.id,
                status: AccountStatus::Failed,
                profile: None,
                message: e.to_string(),
            },
        };
        info!(account = %check.account_id, status = %check.status, "account checked");
        Ok(check)
    }

    fn fail(&self, session: &mut UploadSession, err: UploadError) -> UploadError {
        error!(session = %session.id(), error = %err, "upload session failed");
        if session.fail(err.to_string()).is_ok() {
            self.events.state_changed(session);
        }
        err
    }
}
