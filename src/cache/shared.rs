//! Shared Cache Module
//!
//! Thread-safe handle over a `FileCache`. One mutex guards the cache state;
//! a second map hands out one load gate per path so at most one loader runs
//! for a path at a time, while loads for different paths proceed in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::cache::store::{invoke, keep_if_unchanged};
use crate::cache::{fs_stat, CacheStats, FileCache, Metadata};
use crate::error::{CacheError, Result};
use crate::staleness::{ModifiedTime, StalenessPolicy};

type Gate = Arc<Mutex<()>>;

// == Shared File Cache ==
/// Cloneable, thread-safe handle to a `FileCache`.
pub struct SharedFileCache<V, P = ModifiedTime> {
    inner: Arc<Mutex<FileCache<V, P>>>,
    gates: Arc<Mutex<HashMap<PathBuf, Gate>>>,
}

impl<V, P> Clone for SharedFileCache<V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            gates: Arc::clone(&self.gates),
        }
    }
}

impl<V, P: StalenessPolicy> SharedFileCache<V, P> {
    pub fn new(cache: FileCache<V, P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Get Or Load ==
    /// Same contract as `FileCache::get_or_load`.
    ///
    /// Concurrent callers for the same path wait for the first loader and
    /// then receive its value. The cache lock is not held while the policy
    /// judges the file or the loader runs.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<V>> {
        let gate = self.gate(path)?;
        let result = {
            let _turn = gate.lock().unwrap_or_else(PoisonError::into_inner);
            self.get_or_load_gated(path)
        };
        self.release_gate(path, gate)?;
        result
    }

    fn get_or_load_gated(&self, path: &Path) -> Result<Arc<V>> {
        let current = fs_stat::require_modified_time(path)?;
        let (snapshot, policy, loader) = {
            let cache = self.lock()?;
            (cache.snapshot(path, current), cache.shared_policy(), cache.loader())
        };

        // The policy may read the file; only this path's gate is held
        let verdict = policy.judge(&snapshot.check(path))?;
        if let Some(value) = self.lock()?.accept(path, snapshot.value, verdict) {
            return Ok(value);
        }

        let evidence = policy.gather(path, current);
        match invoke(&loader, path) {
            Ok(value) => {
                let evidence = keep_if_unchanged(path, current, evidence);
                Ok(self.lock()?.commit(path, value, current, evidence))
            }
            Err(e) => {
                self.lock()?.record_load_failure();
                Err(e)
            }
        }
    }

    /// Invokes the loader directly, outside the cache lock.
    pub fn load(&self, path: &Path) -> Result<V> {
        fs_stat::validate_path(path)?;
        let loader = self.lock()?.loader();
        invoke(&loader, path)
    }

    /// Same contract as `FileCache::is_stale`; the policy runs unlocked.
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        let current = fs_stat::require_modified_time(path)?;
        let (snapshot, policy) = {
            let cache = self.lock()?;
            (cache.snapshot(path, current), cache.shared_policy())
        };
        Ok(policy.judge(&snapshot.check(path))?.is_stale())
    }

    pub fn peek(&self, path: &Path) -> Result<Option<Arc<V>>> {
        Ok(self.lock()?.peek(path))
    }

    /// Removes the entry, waiting for any in-flight load of the same path.
    pub fn invalidate(&self, path: &Path) -> Result<bool> {
        let gate = self.gate(path)?;
        let removed = {
            let _turn = gate.lock().unwrap_or_else(PoisonError::into_inner);
            self.lock()?.invalidate(path)
        };
        self.release_gate(path, gate)?;
        Ok(removed)
    }

    pub fn sweep_stale(&self) -> Result<usize> {
        self.lock()?.sweep_stale()
    }

    pub fn release_expired(&self) -> Result<usize> {
        Ok(self.lock()?.release_expired())
    }

    /// Runs `f` on the metadata for `path`, creating the entry if needed.
    pub fn with_metadata<R>(&self, path: &Path, f: impl FnOnce(&mut Metadata) -> R) -> Result<R> {
        Ok(f(self.lock()?.metadata_for(path)))
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.lock()?.stats())
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileCache<V, P>>> {
        self.inner
            .lock()
            .map_err(|_| CacheError::Internal("cache lock poisoned".to_string()))
    }

    // == Load Gates ==

    fn gate(&self, path: &Path) -> Result<Gate> {
        let mut gates = self.gates_lock()?;
        Ok(Arc::clone(gates.entry(path.to_path_buf()).or_default()))
    }

    /// Drops the gate for `path` once no other caller holds it.
    fn release_gate(&self, path: &Path, gate: Gate) -> Result<()> {
        let mut gates = self.gates_lock()?;
        // One count for the map, one for `gate`
        if Arc::strong_count(&gate) == 2 {
            gates.remove(path);
            debug!(path = %path.display(), "released load gate");
        }
        Ok(())
    }

    fn gates_lock(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, Gate>>> {
        self.gates
            .lock()
            .map_err(|_| CacheError::Internal("load gate lock poisoned".to_string()))
    }
}

impl<V, P: StalenessPolicy> From<FileCache<V, P>> for SharedFileCache<V, P> {
    fn from(cache: FileCache<V, P>) -> Self {
        Self::new(cache)
    }
}
