// Cache entry inspection — local filesystem state for a destination path.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

/// On-disk state of a cache entry. Re-read on demand rather than cached,
/// because the transfer engine mutates the file while streaming.
#[derive(Debug, Clone)]
pub struct LocalCacheState {
    pub exists: bool,
    pub size_bytes: u64,
    pub last_modified: Option<SystemTime>,
}

impl LocalCacheState {
    fn absent() -> Self {
        Self {
            exists: false,
            size_bytes: 0,
            last_modified: None,
        }
    }
}

/// Stat the destination path. A missing file is a valid state, not an
/// error; only permission/device failures surface as `Io`.
pub fn inspect(path: &Path) -> Result<LocalCacheState> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(LocalCacheState {
            exists: true,
            size_bytes: meta.len(),
            last_modified: meta.modified().ok(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LocalCacheState::absent()),
        Err(e) => Err(e.into()),
    }
}
