//! Outcomes and events reported by the engine.

use assetlane_protocol::{AccountStatus, Profile};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::UploadError;
use crate::session::{SessionState, UploadSession};

/// Progress event emitted while sessions run.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// A session entered a new state.
    StateChanged {
        session_id: Uuid,
        state: SessionState,
    },
    /// A discovery candidate was tried and not accepted.
    CandidateFailed {
        session_id: Uuid,
        endpoint: String,
        error: String,
    },
    /// Bytes handed to storage so far.
    TransferProgress {
        session_id: Uuid,
        bytes_sent: u64,
        total_bytes: u64,
    },
}

/// A successfully published catalog item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedItem {
    pub session_id: Uuid,
    pub asset_id: String,
    pub category_id: String,
    pub build_confirmed: bool,
}

/// Tagged result of a finalize call, suitable for handing to a caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl From<Result<PublishedItem, UploadError>> for FinalizeOutcome {
    fn from(result: Result<PublishedItem, UploadError>) -> Self {
        match result {
            Ok(item) => Self {
                success: true,
                message: format!("item published for asset {}", item.asset_id),
                asset_id: Some(item.asset_id),
                error_kind: None,
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                asset_id: None,
                error_kind: Some(e.kind()),
            },
        }
    }
}

/// Result of verifying a linked account's credentials.
///
/// The engine does not persist the status; the caller decides what to do
/// with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCheck {
    pub account_id: String,
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub message: String,
}

/// Non-blocking sender for [`UploadEvent`]s.
///
/// Events are dropped when the channel is full or nobody listens, so a slow
/// consumer never stalls an upload.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<UploadEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<UploadEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }

    pub(crate) fn state_changed(&self, session: &UploadSession) {
        self.emit(UploadEvent::StateChanged {
            session_id: session.id(),
            state: session.state().clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_success() {
        let outcome = FinalizeOutcome::from(Ok(PublishedItem {
            session_id: Uuid::nil(),
            asset_id: "asset-1".into(),
            category_id: "DR_TOP_01".into(),
            build_confirmed: true,
        }));
        assert!(outcome.success);
        assert_eq!(outcome.asset_id.as_deref(), Some("asset-1"));
        assert!(outcome.message.contains("asset-1"));
    }

    #[test]
    fn outcome_from_error_is_tagged() {
        let outcome = FinalizeOutcome::from(Err(UploadError::Publish("rejected".into())));
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some("publish_error"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["errorKind"], "publish_error");
        assert!(json.get("assetId").is_none());
    }

    #[tokio::test]
    async fn sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = EventSink::new(tx);
        for _ in 0..3 {
            sink.emit(UploadEvent::TransferProgress {
                session_id: Uuid::nil(),
                bytes_sent: 1,
                total_bytes: 2,
            });
        }
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());

        EventSink::default().emit(UploadEvent::TransferProgress {
            session_id: Uuid::nil(),
            bytes_sent: 0,
            total_bytes: 0,
        });
    }
}
