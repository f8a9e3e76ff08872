//! LRU Tracker Module
//!
//! Tracks recency of retained paths so the oldest pin is released first.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

// == LRU Tracker ==
/// Tracks access order of retained paths.
///
/// Paths are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<PathBuf>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a path as recently used (moves to front).
    pub fn touch(&mut self, path: &Path) {
        self.remove(path);
        self.order.push_front(path.to_path_buf());
    }

    // == Remove ==
    /// Removes a path from the tracker.
    pub fn remove(&mut self, path: &Path) {
        self.order.retain(|p| p != path);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used path.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<PathBuf> {
        self.order.pop_back()
    }

    // == Peek Oldest ==
    /// Returns the least recently used path without removing it.
    pub fn peek_oldest(&self) -> Option<&Path> {
        self.order.back().map(PathBuf::as_path)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.order.iter().any(|p| p == path)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
    }

    #[test]
    fn test_lru_touch_existing_path() {
        let mut lru = LruTracker::new();

        lru.touch(p("a.txt"));
        lru.touch(p("b.txt"));
        lru.touch(p("c.txt"));
        assert_eq!(lru.peek_oldest(), Some(p("a.txt")));

        // Touch a.txt again - should move to front
        lru.touch(p("a.txt"));

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(p("b.txt")));
    }

    #[test]
    fn test_lru_evict_order() {
        let mut lru = LruTracker::new();

        lru.touch(p("a"));
        lru.touch(p("b"));
        lru.touch(p("c"));
        lru.touch(p("a"));

        assert_eq!(lru.evict_oldest(), Some(PathBuf::from("b")));
        assert_eq!(lru.evict_oldest(), Some(PathBuf::from("c")));
        assert_eq!(lru.evict_oldest(), Some(PathBuf::from("a")));
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruTracker::new();

        lru.touch(p("a"));
        lru.touch(p("b"));
        lru.remove(p("a"));
        lru.remove(p("missing"));

        assert_eq!(lru.len(), 1);
        assert!(!lru.contains(p("a")));
        assert!(lru.contains(p("b")));
    }

    #[test]
    fn test_lru_touch_same_path_multiple_times() {
        let mut lru = LruTracker::new();

        lru.touch(p("a"));
        lru.touch(p("a"));
        lru.touch(p("a"));

        assert_eq!(lru.len(), 1);
        lru.clear();
        assert!(lru.is_empty());
    }
}
