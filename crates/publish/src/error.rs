//! Upload error taxonomy.

use assetlane_transfer::TransferError;

use crate::session::SessionState;

/// Errors produced while preparing, transferring or finalizing an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("account {account_id} is not ready: {reason}")]
    AccountNotReady { account_id: String, reason: String },

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(
        "no upload endpoint accepted the request (tried {}); last error: {}",
        .attempted.join(", "),
        .last_error
    )]
    DiscoveryExhausted {
        attempted: Vec<String>,
        last_error: String,
    },

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("asset link failed: {link_error}; fallback create failed: {fallback_error}")]
    Link {
        link_error: String,
        fallback_error: String,
    },

    #[error("item publish failed: {0}")]
    Publish(String),

    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UploadError {
    /// Stable tag for the error, used in serialized outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccountNotReady { .. } => "account_not_ready",
            Self::UnknownCategory(_) => "unknown_category",
            Self::InvalidFile(_) => "invalid_file",
            Self::Auth(_) => "auth_error",
            Self::DiscoveryExhausted { .. } => "discovery_exhausted",
            Self::Transfer(_) => "transfer_error",
            Self::Link { .. } => "link_error",
            Self::Publish(_) => "publish_error",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Json(_) => "json_error",
        }
    }
}
