//! thumbsmith-cache: content-addressed thumbnail cache.
//!
//! Wraps the sans-IO [`thumbsmith_pipeline`] with everything that touches
//! storage: opening sources, naming thumbnails by fingerprint, skipping
//! renders whose file already exists, and persisting new renders
//! atomically.
//!
//! Cached files live flat in one output directory as
//! `{md5(source)}_{md5(history)}.{format}`. That naming is the only
//! on-disk contract.

pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod inflight;
pub mod source;
pub mod thumbnail;

pub use cache::ThumbnailCache;
pub use config::CacheConfig;
pub use error::CacheError;
pub use fs::{Filesystem, LocalFilesystem};
pub use source::Source;
pub use thumbnail::Thumbnail;
