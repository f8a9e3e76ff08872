//! Sweep Task
//!
//! Background task that periodically drops entries whose files were deleted
//! and releases retained values whose TTL elapsed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SharedFileCache;
use crate::staleness::StalenessPolicy;

/// Spawns a background task that periodically sweeps the cache.
///
/// The filesystem checks run on the blocking pool. The returned handle can
/// be used to abort the task during shutdown.
///
/// # Example
/// ```ignore
/// let cache = SharedFileCache::new(FileCache::new(loader));
/// let sweep_handle = spawn_sweep_task(cache.clone(), 30);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V, P>(cache: SharedFileCache<V, P>, interval_secs: u64) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
    P: StalenessPolicy + 'static,
{
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting sweep task with interval of {} seconds", interval.as_secs());

        loop {
            tokio::time::sleep(interval).await;

            let cache = cache.clone();
            let outcome =
                tokio::task::spawn_blocking(move || (cache.sweep_stale(), cache.release_expired()))
                    .await;

            let (swept, released) = match outcome {
                Ok(results) => results,
                Err(e) => {
                    warn!("Sweep: worker failed: {}", e);
                    continue;
                }
            };

            match swept {
                Ok(0) => debug!("Sweep: no entries for missing files"),
                Ok(removed) => info!("Sweep: removed {} entries for missing files", removed),
                Err(e) => warn!("Sweep: {}", e),
            }
            match released {
                Ok(0) => {}
                Ok(count) => debug!("Sweep: released {} expired values", count),
                Err(e) => warn!("Sweep: {}", e),
            }
        }
    })
}
