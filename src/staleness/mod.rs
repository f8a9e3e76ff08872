//! Staleness Policies
//!
//! Decides whether a cached value still reflects its file. The cache always
//! computes the cheap modification-time comparison; a policy may confirm or
//! overrule a "modified" verdict with a stronger check.
//!
//! Policies keep whatever they learn as *evidence* in the entry's metadata.
//! The cache copies the evidence out before asking the policy, so a policy
//! may read the file without the cache being locked.

mod content_hash;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::cache::Metadata;
use crate::error::Result;

pub use content_hash::{ContentHash, ContentStamp};

// == Freshness Check ==
/// Everything a policy may look at when judging one path.
#[derive(Debug)]
pub struct FreshnessCheck<'a, E> {
    path: &'a Path,
    recorded: Option<DateTime<Utc>>,
    current: DateTime<Utc>,
    evidence: Option<&'a E>,
}

impl<'a, E> FreshnessCheck<'a, E> {
    pub fn new(
        path: &'a Path,
        recorded: Option<DateTime<Utc>>,
        current: DateTime<Utc>,
        evidence: Option<&'a E>,
    ) -> Self {
        Self {
            path,
            recorded,
            current,
            evidence,
        }
    }

    pub fn path(&self) -> &'a Path {
        self.path
    }

    /// Modification time recorded with the cached value, if any.
    pub fn recorded(&self) -> Option<DateTime<Utc>> {
        self.recorded
    }

    /// Modification time the file has now.
    pub fn current(&self) -> DateTime<Utc> {
        self.current
    }

    /// The cheap check: true if nothing was recorded or the timestamp moved.
    pub fn modified_since_load(&self) -> bool {
        self.recorded != Some(self.current)
    }

    /// Evidence the policy recorded for this entry earlier.
    pub fn evidence(&self) -> Option<&'a E> {
        self.evidence
    }
}

// == Verdict ==
/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<E> {
    /// The cached value is current
    Fresh,
    /// The cached value is current, and this evidence should replace the
    /// stored one so the same check is not repeated
    Confirmed(E),
    /// The value must be reloaded
    Stale,
}

impl<E> Verdict<E> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Verdict::Stale)
    }
}

// == Staleness Policy ==
/// Pluggable freshness decision.
///
/// `judge` must not have side effects and must give the same answer when
/// asked twice about unchanged content. It may read the file. Evidence is
/// written back only through the cache: `gather` runs before the loader and
/// its result is stored after a successful load, provided the file's
/// timestamp did not move in between; `Verdict::Confirmed` evidence is
/// stored on a hit.
pub trait StalenessPolicy: Send + Sync {
    /// What the policy remembers about an entry between checks.
    type Evidence: Clone + Send + Sync + 'static;

    fn judge(&self, check: &FreshnessCheck<'_, Self::Evidence>) -> Result<Verdict<Self::Evidence>>;

    /// Collects evidence for the content about to be loaded.
    fn gather(&self, _path: &Path, _modified_at: DateTime<Utc>) -> Option<Self::Evidence> {
        None
    }

    /// Reads this policy's evidence out of an entry's metadata.
    fn recall(&self, _metadata: &Metadata) -> Option<Self::Evidence> {
        None
    }

    /// Stores evidence in an entry's metadata; None forgets it.
    fn record(&self, _metadata: &mut Metadata, _evidence: Option<Self::Evidence>) {}
}

// == Modified Time ==
/// Default policy: stale whenever the modification timestamp changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTime;

impl StalenessPolicy for ModifiedTime {
    type Evidence = ();

    fn judge(&self, check: &FreshnessCheck<'_, ()>) -> Result<Verdict<()>> {
        Ok(if check.modified_since_load() {
            Verdict::Stale
        } else {
            Verdict::Fresh
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_modified_time_unchanged_is_fresh() {
        let check = FreshnessCheck::new(Path::new("f"), Some(stamp(10)), stamp(10), None);
        assert_eq!(ModifiedTime.judge(&check).unwrap(), Verdict::Fresh);
    }

    #[test]
    fn test_modified_time_changed_is_stale() {
        // Moving backwards counts too
        let check = FreshnessCheck::new(Path::new("f"), Some(stamp(10)), stamp(9), None);
        assert!(ModifiedTime.judge(&check).unwrap().is_stale());
    }

    #[test]
    fn test_modified_time_never_loaded_is_stale() {
        let check = FreshnessCheck::new(Path::new("f"), None, stamp(10), None);
        assert!(check.modified_since_load());
        assert!(ModifiedTime.judge(&check).unwrap().is_stale());
    }

    #[test]
    fn test_modified_time_keeps_no_evidence() {
        let mut metadata = Metadata::new();
        ModifiedTime.record(&mut metadata, Some(()));

        assert!(metadata.is_empty());
        assert!(ModifiedTime.gather(Path::new("f"), stamp(1)).is_none());
        assert!(ModifiedTime.recall(&metadata).is_none());
    }
}
