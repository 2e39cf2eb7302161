// Error taxonomy for probing, transfer, and cache inspection.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The metadata probe failed. Fatal to resource construction: every
    /// later decision needs real remote metadata.
    #[error("metadata probe failed for {url}: {reason}")]
    Resolution { url: String, reason: String },

    /// No response headers arrived within the configured bound. The
    /// on-disk prefix stays valid for a later resume.
    #[error("timed out after {0:?} waiting for response headers")]
    HeaderTimeout(Duration),

    /// The connection failed mid-stream. Same recovery semantics as a
    /// header timeout.
    #[error("transport failed: {0}")]
    Transport(String),

    /// Local filesystem failure. Flushed chunks are never rolled back.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Another transfer session already owns this output path.
    #[error("transfer already active for {}", .0.display())]
    PathBusy(PathBuf),
}

pub type Result<T> = std::result::Result<T, FetchError>;
