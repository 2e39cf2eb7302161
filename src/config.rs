use std::time::Duration;

use serde::Deserialize;

/// Size of each streamed chunk written and flushed to the output file (1 MB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Seconds to wait for response headers before failing a transfer.
/// Bounds header arrival only, never total streaming duration.
pub const DEFAULT_HEADER_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration for the cache engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Size of each download chunk in bytes.
    pub chunk_size: usize,
    /// Seconds to wait for response headers on a range request.
    pub header_timeout_secs: u64,
}

impl EngineConfig {
    pub fn header_timeout(&self) -> Duration {
        Duration::from_secs(self.header_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_timeout_secs: DEFAULT_HEADER_TIMEOUT_SECS,
        }
    }
}
