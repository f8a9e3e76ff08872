//! Cache Entry Module
//!
//! Defines the per-path record: a weak value handle, the modification
//! timestamp it was loaded at, and optional policy metadata.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};

use crate::cache::Metadata;

// == Cache Entry ==
/// Represents the cached state for a single file path.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Weak handle to the last loaded value, None = never loaded
    value: Option<Weak<V>>,
    /// File modification time recorded together with `value`
    modified_at: Option<DateTime<Utc>>,
    /// Wall-clock time of the last successful load
    loaded_at: Option<DateTime<Utc>>,
    /// Lazily created policy metadata
    metadata: Option<Metadata>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            modified_at: None,
            loaded_at: None,
            metadata: None,
        }
    }
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an empty entry with no value.
    pub fn new() -> Self {
        Self::default()
    }

    // == Value ==
    /// Returns the value if it is still alive.
    pub fn value(&self) -> Option<Arc<V>> {
        self.value.as_ref().and_then(Weak::upgrade)
    }

    /// Returns true if the entry holds a live value.
    pub fn is_live(&self) -> bool {
        self.value.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    // == Store ==
    /// Replaces the value and its modification timestamp together.
    pub fn store(&mut self, value: &Arc<V>, modified_at: DateTime<Utc>) {
        self.value = Some(Arc::downgrade(value));
        self.modified_at = Some(modified_at);
        self.loaded_at = Some(Utc::now());
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    // == Metadata ==
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Returns the metadata map, creating it on first use.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::new)
    }

    /// Returns the metadata map only if it was already created.
    pub fn existing_metadata_mut(&mut self) -> Option<&mut Metadata> {
        self.metadata.as_mut()
    }
}
