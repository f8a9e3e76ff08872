//! Retention Module
//!
//! Entries only hold weak handles, so a value lives as long as somebody owns
//! it. The retention set is that somebody for a bounded number of recently
//! used paths: it keeps strong handles, releasing the least recently used
//! one on overflow and any whose TTL has elapsed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::LruTracker;

// == Retention Policy ==
/// How many values the cache keeps alive on its own, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of strong handles held, 0 = purely weak caching
    pub max_retained: usize,
    /// Time after the last access at which a handle is released
    pub ttl: Option<Duration>,
}

impl RetentionPolicy {
    pub fn new(max_retained: usize, ttl: Option<Duration>) -> Self {
        Self { max_retained, ttl }
    }

    /// Holds no strong handles: values live only while callers own them.
    pub fn weak_only() -> Self {
        Self::new(0, None)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(64, Some(Duration::from_secs(300)))
    }
}

// == Pinned Value ==
#[derive(Debug)]
struct Pinned<V> {
    _value: Arc<V>,
    expires_at: Option<DateTime<Utc>>,
}

impl<V> Pinned<V> {
    /// Expired once the current time is at or past the deadline.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Retained Set ==
/// Bounded set of strong value handles with LRU and TTL release.
#[derive(Debug)]
pub struct RetainedSet<V> {
    policy: RetentionPolicy,
    pins: HashMap<PathBuf, Pinned<V>>,
    lru: LruTracker,
}

impl<V> RetainedSet<V> {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            pins: HashMap::new(),
            lru: LruTracker::new(),
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    // == Pin ==
    /// Keeps `value` alive for `path`, refreshing its deadline.
    ///
    /// Returns the number of other pins released to make room.
    pub fn pin(&mut self, path: &Path, value: Arc<V>) -> usize {
        if self.policy.max_retained == 0 {
            return 0;
        }

        let mut evicted = 0;
        if !self.pins.contains_key(path) {
            while self.pins.len() >= self.policy.max_retained {
                match self.lru.evict_oldest() {
                    Some(oldest) => {
                        self.pins.remove(&oldest);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }

        let expires_at = self.policy.ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        });
        self.pins.insert(
            path.to_path_buf(),
            Pinned {
                _value: value,
                expires_at,
            },
        );
        self.lru.touch(path);
        evicted
    }

    // == Release ==
    /// Drops the strong handle for `path`, if any.
    pub fn release(&mut self, path: &Path) -> bool {
        self.lru.remove(path);
        self.pins.remove(path).is_some()
    }

    // == Release Expired ==
    /// Drops every handle whose TTL has elapsed. Returns how many.
    pub fn release_expired(&mut self) -> usize {
        let now = Utc::now();
        let expired: Vec<PathBuf> = self
            .pins
            .iter()
            .filter(|(_, pin)| pin.is_expired(now))
            .map(|(path, _)| path.clone())
            .collect();

        for path in &expired {
            self.release(path);
        }
        expired.len()
    }

    pub fn clear(&mut self) {
        self.pins.clear();
        self.lru.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.pins.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_weak_only_retains_nothing() {
        let mut set = RetainedSet::new(RetentionPolicy::weak_only());
        let value = Arc::new(1);
        let weak = Arc::downgrade(&value);

        assert_eq!(set.pin(Path::new("a"), value), 0);

        assert!(set.is_empty());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_pin_keeps_value_alive() {
        let mut set = RetainedSet::new(RetentionPolicy::new(4, None));
        let value = Arc::new("v".to_string());
        let weak = Arc::downgrade(&value);

        set.pin(Path::new("a"), value);

        assert!(set.contains(Path::new("a")));
        assert_eq!(weak.upgrade().as_deref(), Some(&"v".to_string()));
    }

    #[test]
    fn test_pin_evicts_least_recently_used() {
        let mut set = RetainedSet::new(RetentionPolicy::new(2, None));
        let a = Arc::new('a');
        let weak_a = Arc::downgrade(&a);

        set.pin(Path::new("a"), a);
        set.pin(Path::new("b"), Arc::new('b'));
        let evicted = set.pin(Path::new("c"), Arc::new('c'));

        assert_eq!(evicted, 1);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(Path::new("a")));
        assert!(weak_a.upgrade().is_none());
    }

    #[test]
    fn test_repin_refreshes_recency() {
        let mut set = RetainedSet::new(RetentionPolicy::new(2, None));

        set.pin(Path::new("a"), Arc::new(1));
        set.pin(Path::new("b"), Arc::new(2));
        // Re-pinning an existing path never evicts
        assert_eq!(set.pin(Path::new("a"), Arc::new(1)), 0);
        set.pin(Path::new("c"), Arc::new(3));

        assert!(set.contains(Path::new("a")));
        assert!(!set.contains(Path::new("b")));
    }

    #[test]
    fn test_release_expired() {
        let mut set = RetainedSet::new(RetentionPolicy::new(8, Some(Duration::from_millis(50))));
        set.pin(Path::new("a"), Arc::new(1));

        assert_eq!(set.release_expired(), 0);

        sleep(Duration::from_millis(120));

        assert_eq!(set.release_expired(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_release_and_clear() {
        let mut set = RetainedSet::new(RetentionPolicy::default());
        set.pin(Path::new("a"), Arc::new(1));
        set.pin(Path::new("b"), Arc::new(2));

        assert!(set.release(Path::new("a")));
        assert!(!set.release(Path::new("a")));

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let pin = Pinned {
            _value: Arc::new(()),
            expires_at: Some(now),
        };

        assert!(pin.is_expired(now), "Pin should be expired at boundary");
    }
}
