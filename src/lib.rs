// Resumable remote-asset cache engine — metadata probing, staleness policy,
// and chunked range transfers to a local cache path.

pub mod config;
pub mod engine;
pub mod error;
pub mod source;

pub use config::EngineConfig;
pub use engine::resource::{CachedResource, ResourceDescriptor};
pub use engine::transfer::TransferOutcome;
pub use error::FetchError;
