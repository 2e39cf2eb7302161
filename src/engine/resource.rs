// Cached resource orchestration — one remote resource mapped to one local path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::inspector;
use crate::engine::policy::{self, StalenessMode, TransferDecision};
use crate::engine::progress::{ProgressSnapshot, TransferProgress};
use crate::engine::transfer::{TransferEngine, TransferOutcome};
use crate::error::Result;
use crate::source::http_source::HttpSource;
use crate::source::traits::{RemoteMetadata, RemoteSource};

/// Remote URL plus its designated local cache path. Immutable once created.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub remote_url: String,
    pub local_path: PathBuf,
}

pub struct CachedResource {
    descriptor: ResourceDescriptor,
    remote: RemoteMetadata,
    engine: TransferEngine,
    progress: Arc<TransferProgress>,
    cancel: Mutex<CancellationToken>,
}

impl std::fmt::Debug for CachedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResource")
            .field("descriptor", &self.descriptor)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

impl CachedResource {
    /// Probe the remote over HTTP and construct the resource. The probe
    /// runs exactly once, here; a failed probe aborts construction since
    /// every later decision needs real remote metadata.
    pub async fn open(
        remote_url: String,
        local_path: PathBuf,
        config: &EngineConfig,
    ) -> Result<Self> {
        let source = Arc::new(HttpSource::new(remote_url.clone(), HashMap::new()));
        let descriptor = ResourceDescriptor {
            remote_url,
            local_path,
        };
        Self::with_source(source, descriptor, config).await
    }

    /// Same as [`CachedResource::open`] with a caller-supplied source
    /// (non-HTTP backends, test doubles).
    pub async fn with_source(
        source: Arc<dyn RemoteSource>,
        descriptor: ResourceDescriptor,
        config: &EngineConfig,
    ) -> Result<Self> {
        let remote = source.probe().await?;
        info!(
            "probed {}: {} bytes",
            descriptor.remote_url, remote.size_bytes
        );
        if StalenessMode::for_metadata(&remote) == StalenessMode::AlwaysStale {
            info!(
                "no usable modification time from {}; every download will re-fetch",
                descriptor.remote_url
            );
        }

        let progress = Arc::new(TransferProgress::new(remote.size_bytes));
        let engine = TransferEngine::new(source, config);

        Ok(Self {
            descriptor,
            remote,
            engine,
            progress,
            cancel: Mutex::new(CancellationToken::new()),
        })
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn remote(&self) -> &RemoteMetadata {
        &self.remote
    }

    /// Reconcile the local cache with the remote snapshot: inspect the
    /// file, decide skip/resume/restart, and run the transfer.
    pub async fn download(&self) -> Result<TransferOutcome> {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();

        let local = inspector::inspect(&self.descriptor.local_path)?;
        let decision = policy::decide(&self.remote, &local);
        debug!(
            "decision {:?} for {} (local {} bytes, remote {} bytes)",
            decision,
            self.descriptor.local_path.display(),
            local.size_bytes,
            self.remote.size_bytes
        );

        self.engine
            .execute(
                &self.descriptor.local_path,
                &self.remote,
                decision,
                &self.progress,
                &token,
            )
            .await
    }

    /// Abandon the in-flight transfer at the next chunk boundary. The
    /// on-disk prefix stays valid for a future resume.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Whether the cache entry is complete and current — the gate for
    /// handing the bytes to an artifact loader.
    pub fn is_current(&self) -> Result<bool> {
        let local = inspector::inspect(&self.descriptor.local_path)?;
        Ok(policy::decide(&self.remote, &local) == TransferDecision::Skip)
    }

    /// `file://` form of the local path, for loaders that consume URIs.
    pub fn local_uri(&self) -> String {
        format!("file://{}", self.descriptor.local_path.display())
    }
}
