// Transfer engine — executes one policy decision as a chunked range transfer.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::policy::TransferDecision;
use crate::engine::progress::{TransferProgress, TransferState};
use crate::error::{FetchError, Result};
use crate::source::traits::{RemoteMetadata, RemoteSource};

/// Paths with an active transfer session. Upholds the single-writer
/// invariant across concurrent download attempts on the same file.
static ACTIVE_PATHS: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Exclusive claim on an output path, released on drop.
struct PathGuard {
    path: PathBuf,
}

impl PathGuard {
    fn acquire(path: &Path) -> Result<Self> {
        let mut active = ACTIVE_PATHS.lock();
        if !active.insert(path.to_path_buf()) {
            return Err(FetchError::PathBusy(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        ACTIVE_PATHS.lock().remove(&self.path);
    }
}

/// Result of executing one transfer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Cache was already complete and current; zero requests issued.
    SkippedCurrent,
    /// Transfer ran to completion; the file now matches the remote size.
    Completed { bytes_transferred: u64 },
    /// Abandoned at a chunk boundary; the prefix on disk stays valid for
    /// a future resume.
    Cancelled { bytes_transferred: u64 },
}

pub struct TransferEngine {
    source: Arc<dyn RemoteSource>,
    chunk_size: usize,
    header_timeout: Duration,
}

impl TransferEngine {
    pub fn new(source: Arc<dyn RemoteSource>, config: &EngineConfig) -> Self {
        Self {
            source,
            chunk_size: config.chunk_size,
            header_timeout: config.header_timeout(),
        }
    }

    /// Execute `decision` for `path` against the probed remote snapshot.
    pub async fn execute(
        &self,
        path: &Path,
        remote: &RemoteMetadata,
        decision: TransferDecision,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome> {
        if decision == TransferDecision::Skip {
            progress.reset_bytes(remote.size_bytes);
            progress.set_state(TransferState::Completed);
            debug!("cache current for {}; skipping transfer", path.display());
            return Ok(TransferOutcome::SkippedCurrent);
        }

        match self.run(path, remote, decision, progress, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                progress.set_state(TransferState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        path: &Path,
        remote: &RemoteMetadata,
        decision: TransferDecision,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome> {
        // Claim the path before touching the file.
        let _guard = PathGuard::acquire(path)?;

        let (offset, mut file) = match decision {
            TransferDecision::Restart => {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => debug!("discarded stale copy at {}", path.display()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .await?;
                (0u64, file)
            }
            TransferDecision::Resume { from_offset } => {
                debug!(
                    "resuming {} from offset {} of {}",
                    path.display(),
                    from_offset,
                    remote.size_bytes
                );
                let file = OpenOptions::new().append(true).open(path).await?;
                (from_offset, file)
            }
            TransferDecision::Skip => unreachable!("skip handled before session setup"),
        };

        progress.reset_bytes(offset);

        // Zero-length remote: the truncated file is already complete.
        if offset >= remote.size_bytes {
            progress.set_state(TransferState::Completed);
            return Ok(TransferOutcome::Completed {
                bytes_transferred: 0,
            });
        }

        if cancel.is_cancelled() {
            progress.set_state(TransferState::Failed);
            return Ok(TransferOutcome::Cancelled {
                bytes_transferred: 0,
            });
        }

        progress.set_state(TransferState::RequestSent);
        let end_inclusive = remote.size_bytes - 1;
        let mut body = self
            .source
            .open_range(offset, end_inclusive, self.header_timeout)
            .await?;
        progress.set_state(TransferState::Streaming);

        // Bytes accumulated toward the next full chunk. Only whole chunks
        // are written and flushed, so the file size on disk is always an
        // exact sum of completed chunks and the next resume offset is a
        // true prefix of the remote resource.
        let mut pending = BytesMut::with_capacity(self.chunk_size);
        let mut written = offset;

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    file.flush().await?;
                    debug!(
                        "transfer cancelled at {} of {} bytes for {}",
                        written,
                        remote.size_bytes,
                        path.display()
                    );
                    progress.set_state(TransferState::Failed);
                    return Ok(TransferOutcome::Cancelled {
                        bytes_transferred: written - offset,
                    });
                }
                frame = body.next_chunk() => frame?,
            };

            match frame {
                Some(data) => {
                    pending.extend_from_slice(&data);
                    while pending.len() >= self.chunk_size {
                        let chunk = pending.split_to(self.chunk_size).freeze();
                        write_chunk(&mut file, &chunk, progress).await?;
                        written += chunk.len() as u64;
                    }
                }
                None => break,
            }
        }

        // Trailing short chunk after end of stream.
        if !pending.is_empty() {
            let chunk = pending.split().freeze();
            write_chunk(&mut file, &chunk, progress).await?;
            written += chunk.len() as u64;
        }

        drop(body);
        file.shutdown().await?;

        if written != remote.size_bytes {
            warn!(
                "stream ended early at {} of {} bytes for {}",
                written,
                remote.size_bytes,
                path.display()
            );
            return Err(FetchError::Transport(format!(
                "stream ended early at {} of {} bytes",
                written, remote.size_bytes
            )));
        }

        progress.set_state(TransferState::Completed);
        debug!(
            "transfer complete: {} bytes at {}",
            written,
            path.display()
        );
        Ok(TransferOutcome::Completed {
            bytes_transferred: written - offset,
        })
    }
}

async fn write_chunk(file: &mut File, chunk: &Bytes, progress: &TransferProgress) -> Result<()> {
    file.write_all(chunk).await?;
    // Flush per chunk: a crash leaves a file whose size is exactly the
    // bytes durably written, which is what makes resume safe.
    file.flush().await?;
    progress.record_written(chunk.len() as u64);
    Ok(())
}
