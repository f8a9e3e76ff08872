//! Cache Module
//!
//! Provides the file-keyed memoizing cache with weak value handles,
//! modification-time staleness, and bounded retention.

mod entry;
pub mod fs_stat;
mod lru;
mod metadata;
mod retention;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use metadata::Metadata;
pub use retention::{RetainedSet, RetentionPolicy};
pub use shared::SharedFileCache;
pub use stats::CacheStats;
pub use store::{FileCache, Loader};
