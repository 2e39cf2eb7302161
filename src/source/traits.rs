use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Remote snapshot taken once at probe time. Staleness is not re-checked
/// mid-transfer.
#[derive(Debug, Clone)]
pub struct RemoteMetadata {
    /// Full resource length at probe time.
    pub size_bytes: u64,
    /// `None` when the server supplied no usable modification time.
    pub last_modified: Option<SystemTime>,
}

/// Streaming body of an in-flight range request.
#[async_trait]
pub trait RangeBody: Send {
    /// Next frame of the body, `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Header-only probe for size and modification time.
    async fn probe(&self) -> Result<RemoteMetadata>;

    /// Open a range request for `[start, end_inclusive]`. `header_timeout`
    /// bounds the wait for response headers only.
    async fn open_range(
        &self,
        start: u64,
        end_inclusive: u64,
        header_timeout: Duration,
    ) -> Result<Box<dyn RangeBody>>;
}
