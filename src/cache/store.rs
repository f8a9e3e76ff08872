//! Cache Store Module
//!
//! Main cache engine: path-keyed entries holding weak value handles,
//! modification-time staleness with a pluggable policy, and a bounded
//! retention set that keeps recently used values alive.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{fs_stat, CacheEntry, CacheStats, Metadata, RetainedSet, RetentionPolicy};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::staleness::{FreshnessCheck, ModifiedTime, StalenessPolicy, Verdict};

/// User-supplied function producing a value from a file path.
pub type Loader<V> = Arc<dyn Fn(&Path) -> anyhow::Result<V> + Send + Sync>;

/// What the cache held for a path when a lookup started.
///
/// Owned, so the policy can judge it without the cache borrowed or locked.
#[derive(Debug)]
pub(crate) struct Snapshot<V, E> {
    pub(crate) current: DateTime<Utc>,
    recorded: Option<DateTime<Utc>>,
    evidence: Option<E>,
    pub(crate) value: Option<Arc<V>>,
}

impl<V, E> Snapshot<V, E> {
    pub(crate) fn check<'a>(&'a self, path: &'a Path) -> FreshnessCheck<'a, E> {
        FreshnessCheck::new(path, self.recorded, self.current, self.evidence.as_ref())
    }
}

// == File Cache ==
/// Memoizing cache keyed by file path.
///
/// A value stays valid until the policy `P` reports its file stale. Entries
/// only hold weak handles; the retention set decides which values the cache
/// keeps alive by itself.
pub struct FileCache<V, P = ModifiedTime> {
    /// Per-path state
    entries: HashMap<PathBuf, CacheEntry<V>>,
    /// Strong handles for recently used values
    retained: RetainedSet<V>,
    /// Performance statistics
    stats: CacheStats,
    loader: Loader<V>,
    policy: Arc<P>,
}

impl<V> FileCache<V, ModifiedTime> {
    // == Constructor ==
    /// Creates a cache using modification-time staleness and default retention.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Self::with_policy(loader, ModifiedTime)
    }
}

impl<V, P: StalenessPolicy> FileCache<V, P> {
    /// Creates a cache with a custom staleness policy.
    pub fn with_policy<F>(loader: F, policy: P) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Self {
            entries: HashMap::new(),
            retained: RetainedSet::new(RetentionPolicy::default()),
            stats: CacheStats::new(),
            loader: Arc::new(loader),
            policy: Arc::new(policy),
        }
    }

    /// Creates a cache whose retention comes from `config`.
    pub fn from_config<F>(loader: F, policy: P, config: &CacheConfig) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Self::with_policy(loader, policy).with_retention(config.retention())
    }

    /// Replaces the retention policy, releasing any values already retained.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retained = RetainedSet::new(retention);
        self
    }

    // == Get Or Load ==
    /// Returns the cached value for `path`, loading it if stale or missing.
    ///
    /// Fails with `InvalidInput` if the file does not exist. A loader
    /// failure is returned as `Load` and leaves the entry as it was.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<V>> {
        let current = fs_stat::require_modified_time(path)?;
        let snapshot = self.snapshot(path, current);
        let verdict = self.policy.judge(&snapshot.check(path))?;
        if let Some(value) = self.accept(path, snapshot.value, verdict) {
            return Ok(value);
        }

        let evidence = self.policy.gather(path, current);
        let value = self.load(path).inspect_err(|_| self.stats.record_load_failure())?;
        let evidence = keep_if_unchanged(path, current, evidence);
        Ok(self.commit(path, value, current, evidence))
    }

    // == Load ==
    /// Invokes the loader directly, bypassing and not updating the cache.
    pub fn load(&self, path: &Path) -> Result<V> {
        fs_stat::validate_path(path)?;
        invoke(&self.loader, path)
    }

    // == Is Stale ==
    /// Asks the policy whether the cached value for `path` is out of date.
    ///
    /// A path with no entry is stale. Fails if the file does not exist.
    /// Nothing is recorded, whatever the policy concludes.
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        let current = fs_stat::require_modified_time(path)?;
        let snapshot = self.snapshot(path, current);
        Ok(self.policy.judge(&snapshot.check(path))?.is_stale())
    }

    // == Peek ==
    /// Returns the cached value if it is still alive. No filesystem access, no load.
    pub fn peek(&self, path: &Path) -> Option<Arc<V>> {
        self.entries.get(path).and_then(CacheEntry::value)
    }

    // == Invalidate ==
    /// Removes the entry for `path`. Returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.retained.release(path);
        let removed = self.entries.remove(path).is_some();
        if removed {
            debug!(path = %path.display(), "invalidated entry");
        }
        removed
    }

    // == Sweep Stale ==
    /// Removes every entry whose file no longer exists.
    ///
    /// Only existence is checked, not modification time. Filesystem errors
    /// are returned before anything is removed.
    pub fn sweep_stale(&mut self) -> Result<usize> {
        let mut vanished = Vec::new();
        for path in self.entries.keys() {
            if !fs_stat::exists(path)? {
                vanished.push(path.clone());
            }
        }

        for path in &vanished {
            self.entries.remove(path);
            self.retained.release(path);
        }

        let count = vanished.len();
        self.stats.record_swept(count);
        debug!(removed = count, "swept entries for missing files");
        Ok(count)
    }

    // == Release Expired ==
    /// Stops keeping alive values whose retention TTL elapsed.
    pub fn release_expired(&mut self) -> usize {
        let count = self.retained.release_expired();
        self.stats.record_expirations(count);
        count
    }

    // == Metadata ==
    /// Returns the metadata map for `path`, creating the entry if needed.
    pub fn metadata_for(&mut self, path: &Path) -> &mut Metadata {
        self.entries
            .entry(path.to_path_buf())
            .or_default()
            .metadata_mut()
    }

    pub fn metadata(&self, path: &Path) -> Option<&Metadata> {
        self.entries.get(path).and_then(CacheEntry::metadata)
    }

    pub fn entry(&self, path: &Path) -> Option<&CacheEntry<V>> {
        self.entries.get(path)
    }

    /// Removes all entries and retained values.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.retained.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.retained = self.retained.len();
        stats
    }

    pub fn retention(&self) -> &RetentionPolicy {
        self.retained.policy()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    // == Lookup Phases ==
    // `get_or_load` in pieces, so the shared wrapper can run the policy and
    // the loader without holding its lock.

    pub(crate) fn snapshot(&self, path: &Path, current: DateTime<Utc>) -> Snapshot<V, P::Evidence> {
        let entry = self.entries.get(path);
        Snapshot {
            current,
            recorded: entry.and_then(CacheEntry::modified_at),
            evidence: entry
                .and_then(CacheEntry::metadata)
                .and_then(|metadata| self.policy.recall(metadata)),
            value: entry.and_then(CacheEntry::value),
        }
    }

    /// Serves a hit for a non-stale verdict, storing any confirmed evidence.
    ///
    /// Returns None when the verdict is stale or the value was reclaimed.
    pub(crate) fn accept(
        &mut self,
        path: &Path,
        value: Option<Arc<V>>,
        verdict: Verdict<P::Evidence>,
    ) -> Option<Arc<V>> {
        match verdict {
            Verdict::Stale => return None,
            Verdict::Fresh => {}
            Verdict::Confirmed(evidence) => {
                if let Some(entry) = self.entries.get_mut(path) {
                    self.policy.record(entry.metadata_mut(), Some(evidence));
                }
            }
        }

        let value = value?;
        let evicted = self.retained.pin(path, Arc::clone(&value));
        self.stats.record_evictions(evicted);
        self.stats.record_hit();
        debug!(path = %path.display(), "cache hit");
        Some(value)
    }

    /// Stores a freshly loaded value with the timestamp read before loading.
    pub(crate) fn commit(
        &mut self,
        path: &Path,
        value: V,
        modified_at: DateTime<Utc>,
        evidence: Option<P::Evidence>,
    ) -> Arc<V> {
        let value = Arc::new(value);

        let entry = self.entries.entry(path.to_path_buf()).or_default();
        entry.store(&value, modified_at);
        match evidence {
            Some(evidence) => self.policy.record(entry.metadata_mut(), Some(evidence)),
            None => {
                if let Some(metadata) = entry.existing_metadata_mut() {
                    self.policy.record(metadata, None);
                }
            }
        }

        let evicted = self.retained.pin(path, Arc::clone(&value));
        self.stats.record_evictions(evicted);
        self.stats.record_miss();
        debug!(path = %path.display(), %modified_at, "loaded value");
        value
    }

    pub(crate) fn loader(&self) -> Loader<V> {
        Arc::clone(&self.loader)
    }

    pub(crate) fn shared_policy(&self) -> Arc<P> {
        Arc::clone(&self.policy)
    }

    pub(crate) fn record_load_failure(&mut self) {
        self.stats.record_load_failure();
    }
}

impl<V, P: fmt::Debug> fmt::Debug for FileCache<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("entries", &self.entries.len())
            .field("retained", &self.retained.len())
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Runs the loader, tagging its failure with the path.
pub(crate) fn invoke<V>(loader: &Loader<V>, path: &Path) -> Result<V> {
    loader(path).map_err(|source| CacheError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Drops evidence gathered before a load if the file moved during it.
///
/// The loader may have read newer bytes than the evidence describes; without
/// evidence the next lookup sees the timestamp change and reloads.
pub(crate) fn keep_if_unchanged<E>(
    path: &Path,
    modified_at: DateTime<Utc>,
    evidence: Option<E>,
) -> Option<E> {
    let evidence = evidence?;
    if fs_stat::unchanged_since(path, modified_at) {
        Some(evidence)
    } else {
        debug!(path = %path.display(), "file changed while loading, dropping evidence");
        None
    }
}
