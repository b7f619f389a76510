//! Per-attempt upload session and its state machine.
//!
//! ```text
//! Created → Authenticated → Discovered → Transferred → Linked → Built → Published
//!     └──────────────┴─────────────┴────────────┴──────────┴───────┴──→ Failed
//! ```
//!
//! Transitions only ever move to the immediate successor or to `Failed`.

use std::fmt;

use assetlane_protocol::{BearerToken, FileDescriptor, TransferTarget};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UploadError;

/// Lifecycle state of an [`UploadSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Authenticated,
    Discovered,
    Transferred,
    Linked,
    Built,
    Published,
    Failed(String),
}

impl SessionState {
    /// The only non-failure state reachable from `self`.
    pub fn next(&self) -> Option<SessionState> {
        match self {
            Self::Created => Some(Self::Authenticated),
            Self::Authenticated => Some(Self::Discovered),
            Self::Discovered => Some(Self::Transferred),
            Self::Transferred => Some(Self::Linked),
            Self::Linked => Some(Self::Built),
            Self::Built => Some(Self::Published),
            Self::Published | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Failed(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Authenticated => "authenticated",
            Self::Discovered => "discovered",
            Self::Transferred => "transferred",
            Self::Linked => "linked",
            Self::Built => "built",
            Self::Published => "published",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase-1 result handed to the caller for the direct transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub session_id: Uuid,
    pub account_id: String,
    pub token: BearerToken,
    pub upload_url: String,
    pub transfer_id: String,
    pub category_id: String,
    pub file_name: String,
    pub endpoint: String,
}

impl UploadTicket {
    /// The subset of the ticket the finalize phase needs.
    pub fn finalize_request(&self) -> FinalizeRequest {
        FinalizeRequest {
            transfer_id: self.transfer_id.clone(),
            category_id: self.category_id.clone(),
            token: self.token.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

/// Inputs to a detached finalize call, after the caller transferred the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub transfer_id: String,
    pub category_id: String,
    pub token: BearerToken,
    pub file_name: String,
}

impl FinalizeRequest {
    /// Rejects requests that cannot be finalized, before any network call.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.category_id.trim().is_empty() {
            return Err(UploadError::UnknownCategory(self.category_id.clone()));
        }
        if self.transfer_id.trim().is_empty() {
            return Err(UploadError::InvalidFile("transfer id is empty".into()));
        }
        if self.token.is_empty() {
            return Err(UploadError::Auth("token is empty".into()));
        }
        Ok(())
    }
}

/// One upload attempt.
///
/// Sessions are owned values advanced through `&mut self`; they are never
/// shared between concurrent uploads. The token and category id are set
/// once and never replaced.
#[derive(Debug)]
pub struct UploadSession {
    id: Uuid,
    account_id: String,
    file: FileDescriptor,
    category: String,
    category_id: String,
    token: Option<BearerToken>,
    target: Option<TransferTarget>,
    asset_id: Option<String>,
    build_confirmed: bool,
    state: SessionState,
    history: Vec<SessionState>,
}

impl UploadSession {
    /// Starts a session for an already-resolved category.
    pub fn new(
        account_id: impl Into<String>,
        file: FileDescriptor,
        category: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.into(),
            file,
            category: category.into(),
            category_id: category_id.into(),
            token: None,
            target: None,
            asset_id: None,
            build_confirmed: false,
            state: SessionState::Created,
            history: vec![SessionState::Created],
        }
    }

    /// Rebuilds a session for finalize-only use.
    ///
    /// The caller attests that the bytes were transferred, so the session
    /// starts in `Transferred`. The storage URL is not known here.
    pub fn resume(req: FinalizeRequest) -> Self {
        let file = FileDescriptor::new(req.file_name, 0);
        Self {
            id: Uuid::new_v4(),
            account_id: String::new(),
            file,
            category: String::new(),
            category_id: req.category_id,
            token: Some(req.token),
            target: Some(TransferTarget {
                upload_url: String::new(),
                transfer_id: req.transfer_id,
                endpoint: String::new(),
            }),
            asset_id: None,
            build_confirmed: false,
            state: SessionState::Transferred,
            history: vec![SessionState::Transferred],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    pub fn target(&self) -> Option<&TransferTarget> {
        self.target.as_ref()
    }

    pub fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }

    /// `true` once the build was accepted (and, when polled, reported ready).
    pub fn build_confirmed(&self) -> bool {
        self.build_confirmed
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Every state the session has been in, oldest first.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Ticket for the caller, available once a target was discovered.
    pub fn ticket(&self) -> Option<UploadTicket> {
        let token = self.token.clone()?;
        let target = self.target.as_ref()?;
        Some(UploadTicket {
            session_id: self.id,
            account_id: self.account_id.clone(),
            token,
            upload_url: target.upload_url.clone(),
            transfer_id: target.transfer_id.clone(),
            category_id: self.category_id.clone(),
            file_name: self.file.name.clone(),
            endpoint: target.endpoint.clone(),
        })
    }

    pub fn authenticated(&mut self, token: BearerToken) -> Result<(), UploadError> {
        self.advance(SessionState::Authenticated)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn discovered(&mut self, target: TransferTarget) -> Result<(), UploadError> {
        self.advance(SessionState::Discovered)?;
        self.target = Some(target);
        Ok(())
    }

    pub fn transferred(&mut self) -> Result<(), UploadError> {
        self.advance(SessionState::Transferred)
    }

    pub fn linked(&mut self, asset_id: String) -> Result<(), UploadError> {
        self.advance(SessionState::Linked)?;
        self.asset_id = Some(asset_id);
        Ok(())
    }

    pub fn built(&mut self, confirmed: bool) -> Result<(), UploadError> {
        self.advance(SessionState::Built)?;
        self.build_confirmed = confirmed;
        Ok(())
    }

    pub fn published(&mut self) -> Result<(), UploadError> {
        self.advance(SessionState::Published)
    }

    /// Moves the session to `Failed`. Terminal sessions cannot fail again.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), UploadError> {
        let to = SessionState::Failed(reason.into());
        if self.state.is_terminal() {
            return Err(UploadError::InvalidTransition {
                from: self.state.clone(),
                to,
            });
        }
        self.enter(to);
        Ok(())
    }

    fn advance(&mut self, to: SessionState) -> Result<(), UploadError> {
        if self.state.next().as_ref() != Some(&to) {
            return Err(UploadError::InvalidTransition {
                from: self.state.clone(),
                to,
            });
        }
        self.enter(to);
        Ok(())
    }

    fn enter(&mut self, to: SessionState) {
        self.history.push(to.clone());
        self.state = to;
    }
}
