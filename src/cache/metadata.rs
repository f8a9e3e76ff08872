//! Per-entry metadata map used by staleness policies.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

type Slot = Box<dyn Any + Send + Sync>;

// == Metadata ==
/// Open mapping from string keys to type-erased values.
///
/// Policies use it to stash data (such as a content digest) that lets them
/// avoid recomputing expensive checks. The cache itself never looks inside.
#[derive(Default)]
pub struct Metadata {
    slots: HashMap<String, Slot>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.slots.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.slots.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.slots.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key`, inserting `init()` first if absent.
    ///
    /// A value of a different type under the same key is replaced.
    pub fn get_or_insert_with<T, F>(&mut self, key: &str, init: F) -> &mut T
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let holds_t = self.slots.get(key).is_some_and(|v| v.is::<T>());
        if !holds_t {
            self.slots.insert(key.to_string(), Box::new(init()));
        }
        self.slots
            .get_mut(key)
            .and_then(|v| v.downcast_mut::<T>())
            .unwrap_or_else(|| unreachable!("metadata slot `{key}` holds a different type"))
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.slots.keys().collect();
        keys.sort();
        f.debug_struct("Metadata").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_typed() {
        let mut meta = Metadata::new();
        meta.insert("checksum", [7u8; 4]);

        assert_eq!(meta.get::<[u8; 4]>("checksum"), Some(&[7u8; 4]));
        // Wrong type reads as absent
        assert!(meta.get::<String>("checksum").is_none());
        assert!(meta.contains_key("checksum"));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_get_or_insert_with_keeps_existing() {
        let mut meta = Metadata::new();

        *meta.get_or_insert_with("count", || 1u32) += 1;
        let count = meta.get_or_insert_with("count", || 100u32);

        assert_eq!(*count, 2);
    }

    #[test]
    fn test_get_or_insert_with_replaces_other_type() {
        let mut meta = Metadata::new();
        meta.insert("k", "text".to_string());

        let v = meta.get_or_insert_with("k", || 5i64);
        assert_eq!(*v, 5);
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut meta = Metadata::new();
        meta.insert("a", 1u8);

        assert!(meta.remove("a"));
        assert!(!meta.remove("a"));
        assert!(meta.is_empty());
    }

    #[test]
    fn test_debug_lists_keys() {
        let mut meta = Metadata::new();
        meta.insert("b", 1u8);
        meta.insert("a", 2u8);

        assert_eq!(format!("{:?}", meta), r#"Metadata { keys: ["a", "b"] }"#);
    }
}
