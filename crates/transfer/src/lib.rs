//! Direct-to-storage byte transfer.
//!
//! Moves a package straight to the storage URL handed out during
//! discovery with a single unauthenticated `PUT`. The metadata API never
//! sees the bytes, so its request size limits do not apply here.

mod checksum;
mod direct;
mod progress;

pub use checksum::{StreamDigest, checksum_bytes};
pub use direct::{DirectTransferClient, TransferReceipt};
pub use progress::{ProgressCallback, TransferProgress};

/// Read size used when streaming a file from disk: 256 KiB.
pub const STREAM_CHUNK_SIZE: usize = 256 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("cancelled")]
    Cancelled,
}

impl TransferError {
    /// HTTP status returned by storage, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
