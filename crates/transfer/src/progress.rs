/// Byte counts reported while a transfer is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Completion ratio in `0.0..=1.0`. An empty transfer counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            (self.bytes_sent as f64 / self.total_bytes as f64).min(1.0)
        }
    }
}

/// Callback invoked as chunks are handed to the HTTP body.
pub type ProgressCallback = Box<dyn Fn(TransferProgress) + Send + Sync>;
