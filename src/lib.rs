//! File Memo - a memoizing cache keyed by file path
//!
//! Values are produced by a user-supplied loader and reused until the file's
//! modification time changes, optionally confirmed by a content digest.

pub mod cache;
pub mod config;
pub mod error;
pub mod staleness;
pub mod tasks;

pub use cache::{FileCache, SharedFileCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use staleness::{ContentHash, ContentStamp, ModifiedTime, StalenessPolicy, Verdict};
pub use tasks::spawn_sweep_task;
