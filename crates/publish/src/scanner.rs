//! Ordered upload-endpoint discovery.
//!
//! Candidates are tried strictly one after another, in list order, and the
//! scan stops at the first one whose response carries a transfer target.
//! Candidates are never raced: parallel attempts could create duplicate
//! remote resources or trip rate limiting.

use std::time::Duration;

use assetlane_protocol::{BearerToken, EndpointCandidate, FileDescriptor, TransferTarget};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::UploadError;
use crate::platform::PlatformApi;
use crate::types::{EventSink, UploadEvent};

/// Longest slice of a response body quoted in errors.
const MAX_QUOTED_BODY: usize = 100;

/// Tries candidate endpoints until one yields a transfer target.
pub struct EndpointScanner<'a> {
    platform: &'a dyn PlatformApi,
    attempt_timeout: Duration,
    events: EventSink,
    session_id: Uuid,
}

impl<'a> EndpointScanner<'a> {
    pub fn new(platform: &'a dyn PlatformApi, attempt_timeout: Duration) -> Self {
        Self {
            platform,
            attempt_timeout,
            events: EventSink::default(),
            session_id: Uuid::nil(),
        }
    }

    pub(crate) fn with_events(mut self, events: EventSink, session_id: Uuid) -> Self {
        self.events = events;
        self.session_id = session_id;
        self
    }

    /// Runs discovery for `file` with the session's `token`.
    pub async fn discover(
        &self,
        candidates: &[EndpointCandidate],
        file: &FileDescriptor,
        token: &BearerToken,
    ) -> Result<TransferTarget, UploadError> {
        let mut attempted = Vec::with_capacity(candidates.len());
        let mut last_error = String::from("no candidates configured");

        for candidate in candidates {
            let endpoint = candidate.id();
            attempted.push(endpoint.to_string());
            debug!(endpoint, "trying upload endpoint");

            match self.attempt(candidate, file, token).await {
                Ok(target) => {
                    info!(
                        endpoint,
                        attempts = attempted.len(),
                        "upload endpoint accepted"
                    );
                    return Ok(target);
                }
                Err(err) => {
                    warn!(endpoint, error = %err, "upload endpoint rejected");
                    self.events.emit(UploadEvent::CandidateFailed {
                        session_id: self.session_id,
                        endpoint: endpoint.to_string(),
                        error: err.clone(),
                    });
                    last_error = err;
                }
            }
        }

        Err(UploadError::DiscoveryExhausted {
            attempted,
            last_error,
        })
    }

    /// One bounded attempt. Errors are rendered for logs and `last_error`.
    async fn attempt(
        &self,
        candidate: &EndpointCandidate,
        file: &FileDescriptor,
        token: &BearerToken,
    ) -> Result<TransferTarget, String> {
        let payload = candidate.render_payload(file);
        let call = self
            .platform
            .create_transfer_target(candidate, &payload, token);

        let body = match tokio::time::timeout(self.attempt_timeout, call).await {
            Err(_) => {
                return Err(format!(
                    "timed out after {} ms",
                    self.attempt_timeout.as_millis()
                ));
            }
            Ok(Err(assetlane_platform::Error::Api { status, body })) => {
                return Err(format!("[{status}] {}", quote(&body)));
            }
            Ok(Err(e)) => return Err(e.to_string()),
            Ok(Ok(body)) => body,
        };

        candidate.accept(&body).ok_or_else(|| {
            format!(
                "response has no {} field: {}",
                candidate.accept.url_field,
                quote(&body.to_string())
            )
        })
    }
}

fn quote(body: &str) -> String {
    body.chars().take(MAX_QUOTED_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPlatform, TargetReply};
    use serde_json::json;

    fn candidates(n: usize) -> Vec<EndpointCandidate> {
        (0..n)
            .map(|i| EndpointCandidate::new(format!("/c{i}")).named(format!("cand-{i}")))
            .collect()
    }

    fn file() -> FileDescriptor {
        FileDescriptor::new("shirt.zepeto", 1024)
    }

    fn token() -> BearerToken {
        BearerToken::new("tok-9")
    }

    fn accepted(url: &str, id: &str) -> TargetReply {
        TargetReply::Json(json!({"uploadUrl": url, "fileId": id}))
    }

    #[tokio::test]
    async fn second_candidate_accepted_after_404() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Status(404, "Not Found"));
        mock.push_target(TargetReply::Json(
            json!({"result": {"uploadUrl": "https://x", "fileId": "f1"}}),
        ));

        let list = candidates(3);
        let target = EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&list, &file(), &token())
            .await
            .unwrap();

        assert_eq!(target.upload_url, "https://x");
        assert_eq!(target.transfer_id, "f1");
        assert_eq!(target.endpoint, list[1].id());
        assert_eq!(mock.target_endpoints(), vec!["cand-0", "cand-1"]);
    }

    #[tokio::test]
    async fn stops_at_first_acceptance() {
        for accept_at in 0..4 {
            let mock = MockPlatform::new();
            for _ in 0..accept_at {
                mock.push_target(TargetReply::Status(500, "boom"));
            }
            mock.push_target(accepted("https://s", "f"));
            for _ in accept_at + 1..4 {
                mock.push_target(accepted("https://later", "never"));
            }

            let target = EndpointScanner::new(&mock, Duration::from_secs(5))
                .discover(&candidates(4), &file(), &token())
                .await
                .unwrap();

            assert_eq!(target.upload_url, "https://s");
            assert_eq!(mock.call_count(), accept_at + 1);
            let expected: Vec<String> = (0..=accept_at).map(|i| format!("cand-{i}")).collect();
            assert_eq!(mock.target_endpoints(), expected);
        }
    }

    #[tokio::test]
    async fn exhausted_list_reports_endpoints_and_last_error() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Status(404, "a"));
        mock.push_target(TargetReply::Status(403, "forbidden here"));

        let err = EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&candidates(2), &file(), &token())
            .await
            .unwrap_err();

        match &err {
            UploadError::DiscoveryExhausted {
                attempted,
                last_error,
            } => {
                assert_eq!(attempted, &vec!["cand-0".to_string(), "cand-1".to_string()]);
                assert_eq!(last_error, "[403] forbidden here");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("cand-0"));
    }

    #[tokio::test]
    async fn success_without_target_is_not_accepted() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Json(json!({"ok": true})));
        mock.push_target(accepted("https://s", "f2"));

        let target = EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&candidates(2), &file(), &token())
            .await
            .unwrap();
        assert_eq!(target.transfer_id, "f2");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_list_is_exhausted() {
        let mock = MockPlatform::new();
        let err = EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&[], &file(), &token())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no candidates configured"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_candidate_times_out_and_scan_continues() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Hang);
        mock.push_target(accepted("https://s", "f3"));

        let target = EndpointScanner::new(&mock, Duration::from_secs(15))
            .discover(&candidates(2), &file(), &token())
            .await
            .unwrap();
        assert_eq!(target.transfer_id, "f3");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_recorded_as_last_error() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Hang);

        let err = EndpointScanner::new(&mock, Duration::from_millis(1500))
            .discover(&candidates(1), &file(), &token())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out after 1500 ms"), "{err}");
    }

    #[tokio::test]
    async fn payload_and_token_passed_through() {
        let mock = MockPlatform::new();
        mock.push_target(accepted("https://s", "f"));

        EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&candidates(1), &file(), &token())
            .await
            .unwrap();

        match &mock.calls()[0] {
            crate::mock::Call::CreateTarget { payload, token, .. } => {
                assert_eq!(token, "tok-9");
                assert_eq!(
                    payload,
                    &json!({"name": "shirt.zepeto", "type": "ITEM", "extension": "zepeto"})
                );
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_error_bodies_are_quoted_briefly() {
        let mock = MockPlatform::new();
        let long: &'static str = Box::leak("x".repeat(500).into_boxed_str());
        mock.push_target(TargetReply::Status(502, long));

        let err = EndpointScanner::new(&mock, Duration::from_secs(5))
            .discover(&candidates(1), &file(), &token())
            .await
            .unwrap_err();
        match err {
            UploadError::DiscoveryExhausted { last_error, .. } => {
                assert_eq!(last_error.len(), "[502] ".len() + MAX_QUOTED_BODY);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn candidate_failures_emit_events() {
        let mock = MockPlatform::new();
        mock.push_target(TargetReply::Status(404, "nope"));
        mock.push_target(accepted("https://s", "f"));

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let session_id = Uuid::new_v4();
        EndpointScanner::new(&mock, Duration::from_secs(5))
            .with_events(EventSink::new(tx), session_id)
            .discover(&candidates(2), &file(), &token())
            .await
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            UploadEvent::CandidateFailed {
                session_id,
                endpoint: "cand-0".into(),
                error: "[404] nope".into(),
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
