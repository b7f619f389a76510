use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checksum::{StreamDigest, checksum_bytes};
use crate::progress::{ProgressCallback, TransferProgress};
use crate::{STREAM_CHUNK_SIZE, TransferError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest storage error body kept in [`TransferError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

/// Outcome of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub bytes_sent: u64,
    pub status: u16,
    /// Hex SHA-256 of the transferred bytes.
    pub sha256: String,
}

/// Sends raw bytes to a pre-authorized storage URL.
///
/// No bearer token is attached: the URL returned by discovery is the only
/// credential storage needs. There is no overall request timeout, since
/// packages may be arbitrarily large; only connecting is bounded.
pub struct DirectTransferClient {
    http: reqwest::Client,
}

impl DirectTransferClient {
    pub fn new() -> Result<Self, TransferError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Uploads an in-memory buffer with a single `PUT`.
    pub async fn transfer(
        &self,
        upload_url: &str,
        data: impl Into<Vec<u8>>,
    ) -> Result<TransferReceipt, TransferError> {
        let data = data.into();
        let len = data.len() as u64;
        let sha256 = checksum_bytes(&data);

        let status = self
            .put(upload_url, reqwest::Body::from(data), len, &CancellationToken::new())
            .await?;

        Ok(TransferReceipt {
            bytes_sent: len,
            status,
            sha256,
        })
    }

    /// Streams a file from disk with a single `PUT`.
    ///
    /// The file is never held in memory as a whole. Firing `cancel` drops the
    /// request mid-stream; storage is left to discard the partial upload.
    pub async fn transfer_file(
        &self,
        upload_url: &str,
        path: &Path,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<TransferReceipt, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let total_bytes = file.metadata().await?.len();
        debug!(path = %path.display(), total_bytes, "streaming package");

        // Hashed and counted as chunks leave, so the receipt describes the
        // bytes actually sent.
        let digest = Arc::new(Mutex::new(StreamDigest::default()));
        let tally = Arc::clone(&digest);
        let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let bytes_sent = {
                    let mut digest = tally.lock().unwrap_or_else(|e| e.into_inner());
                    digest.update(bytes);
                    digest.bytes()
                };
                if let Some(cb) = &progress {
                    cb(TransferProgress {
                        bytes_sent,
                        total_bytes,
                    });
                }
            }
            chunk
        });

        let status = self
            .put(
                upload_url,
                reqwest::Body::wrap_stream(stream),
                total_bytes,
                cancel,
            )
            .await?;

        let digest = digest.lock().unwrap_or_else(|e| e.into_inner());
        Ok(TransferReceipt {
            bytes_sent: digest.bytes(),
            status,
            sha256: digest.hex(),
        })
    }

    async fn put(
        &self,
        upload_url: &str,
        body: reqwest::Body,
        len: u64,
        cancel: &CancellationToken,
    ) -> Result<u16, TransferError> {
        let target = display_url(upload_url);
        let request = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, len)
            .body(body)
            .send();

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(target = %target, "transfer cancelled");
                return Err(TransferError::Cancelled);
            }
            resp = request => resp?,
        };

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            warn!(target = %target, status = status.as_u16(), "storage rejected transfer");
            return Err(TransferError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(target = %target, bytes = len, status = status.as_u16(), "transfer complete");
        Ok(status.as_u16())
    }
}

/// Strips the query string, which usually carries the upload signature.
fn display_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".into(),
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
