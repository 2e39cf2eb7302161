// Transfer progress — session state and byte counters shared with callers.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Lifecycle of one transfer session. Cancelled and errored sessions both
/// land in `Failed`; the on-disk prefix stays resumable either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    RequestSent,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub state: TransferState,
    /// Bytes durably on disk for this entry, including any resumed prefix.
    pub bytes_on_disk: u64,
    pub total_bytes: u64,
}

pub struct TransferProgress {
    state: Mutex<TransferState>,
    bytes_on_disk: AtomicU64,
    total_bytes: u64,
}

impl TransferProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            state: Mutex::new(TransferState::Idle),
            bytes_on_disk: AtomicU64::new(0),
            total_bytes,
        }
    }

    pub(crate) fn set_state(&self, state: TransferState) {
        *self.state.lock() = state;
    }

    pub(crate) fn record_written(&self, bytes: u64) {
        self.bytes_on_disk.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Reset the counter to the prefix already on disk when a session starts.
    pub(crate) fn reset_bytes(&self, bytes: u64) {
        self.bytes_on_disk.store(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: *self.state.lock(),
            bytes_on_disk: self.bytes_on_disk.load(Ordering::Relaxed),
            total_bytes: self.total_bytes,
        }
    }
}
