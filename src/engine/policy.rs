// Staleness and resume policy — a pure decision over remote and local state.

use tracing::warn;

use crate::engine::inspector::LocalCacheState;
use crate::source::traits::RemoteMetadata;

/// How staleness is judged for a probed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessMode {
    /// Compare the remote modification time against the local mtime.
    ModifiedSince,
    /// The remote supplied no usable modification time; every check
    /// treats the cache as outdated and re-fetches. Trades wasted
    /// transfer for correctness.
    AlwaysStale,
}

impl StalenessMode {
    pub fn for_metadata(remote: &RemoteMetadata) -> Self {
        if remote.last_modified.is_some() {
            Self::ModifiedSince
        } else {
            Self::AlwaysStale
        }
    }
}

/// Action the transfer engine must take for one download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDecision {
    /// Cache is complete and current; no request issued.
    Skip,
    /// Continue from the byte offset already on disk.
    Resume { from_offset: u64 },
    /// Discard any local file and transfer from offset 0.
    Restart,
}

fn is_outdated(remote: &RemoteMetadata, local: &LocalCacheState) -> bool {
    if !local.exists {
        return true;
    }
    match (remote.last_modified, local.last_modified) {
        (Some(remote_mtime), Some(local_mtime)) => remote_mtime > local_mtime,
        // AlwaysStale mode, or an unreadable local mtime: conservative re-fetch.
        _ => true,
    }
}

/// Decide what to do for a cache entry. Deterministic, no network or
/// disk I/O.
pub fn decide(remote: &RemoteMetadata, local: &LocalCacheState) -> TransferDecision {
    let outdated = is_outdated(remote, local);

    if local.exists && local.size_bytes == remote.size_bytes && !outdated {
        return TransferDecision::Skip;
    }

    if local.size_bytes > remote.size_bytes && !outdated {
        // Current-but-oversized means a corrupt or truncated-then-overwritten
        // entry; never discard it silently.
        warn!(
            "local copy larger than remote ({} > {} bytes) without being stale; restarting",
            local.size_bytes, remote.size_bytes
        );
        return TransferDecision::Restart;
    }

    if outdated {
        return TransferDecision::Restart;
    }

    TransferDecision::Resume {
        from_offset: local.size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn remote(size: u64, mtime: Option<SystemTime>) -> RemoteMetadata {
        RemoteMetadata {
            size_bytes: size,
            last_modified: mtime,
        }
    }

    fn local(exists: bool, size: u64, mtime: Option<SystemTime>) -> LocalCacheState {
        LocalCacheState {
            exists,
            size_bytes: size,
            last_modified: mtime,
        }
    }

    fn earlier() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    fn later() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000)
    }

    #[test]
    fn test_missing_local_restarts() {
        let d = decide(&remote(100, Some(earlier())), &local(false, 0, None));
        assert_eq!(d, TransferDecision::Restart);
    }

    #[test]
    fn test_complete_and_current_skips() {
        let d = decide(
            &remote(100, Some(earlier())),
            &local(true, 100, Some(later())),
        );
        assert_eq!(d, TransferDecision::Skip);
    }

    #[test]
    fn test_partial_and_current_resumes() {
        let d = decide(
            &remote(100, Some(earlier())),
            &local(true, 40, Some(later())),
        );
        assert_eq!(d, TransferDecision::Resume { from_offset: 40 });
    }

    #[test]
    fn test_stale_restarts_regardless_of_size() {
        let r = remote(100, Some(later()));
        assert_eq!(
            decide(&r, &local(true, 100, Some(earlier()))),
            TransferDecision::Restart
        );
        assert_eq!(
            decide(&r, &local(true, 40, Some(earlier()))),
            TransferDecision::Restart
        );
    }

    #[test]
    fn test_oversized_but_current_restarts() {
        let d = decide(
            &remote(100, Some(earlier())),
            &local(true, 150, Some(later())),
        );
        assert_eq!(d, TransferDecision::Restart);
    }

    #[test]
    fn test_always_stale_mode_never_skips() {
        let r = remote(100, None);
        assert_eq!(StalenessMode::for_metadata(&r), StalenessMode::AlwaysStale);
        assert_eq!(
            decide(&r, &local(true, 100, Some(later()))),
            TransferDecision::Restart
        );
    }

    #[test]
    fn test_decide_is_pure() {
        let r = remote(100, Some(earlier()));
        let l = local(true, 40, Some(later()));
        let first = decide(&r, &l);
        for _ in 0..10 {
            assert_eq!(decide(&r, &l), first);
        }
    }
}
