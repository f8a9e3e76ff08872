//! Content digest policy.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::Metadata;
use crate::error::Result;
use crate::staleness::{FreshnessCheck, StalenessPolicy, Verdict};

// == Content Stamp ==
/// Digest of a file's bytes together with the timestamp they were read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStamp {
    pub modified_at: DateTime<Utc>,
    pub digest: blake3::Hash,
}

// == Content Hash ==
/// Confirms timestamp changes against a BLAKE3 digest of the file.
///
/// A file whose timestamp moved but whose bytes are identical to the last
/// load is reported fresh, trading a read of the file for a skipped reload.
/// Once a timestamp has been confirmed it is remembered, so each distinct
/// timestamp costs at most one read. When the timestamp is unchanged the
/// file is never read.
///
/// Clones share the digest counter.
#[derive(Debug, Clone, Default)]
pub struct ContentHash {
    digests: Arc<AtomicU64>,
}

impl ContentHash {
    /// Metadata key holding the stamp of the last verified content.
    pub const STAMP_KEY: &'static str = "content_hash.stamp";

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stamp stored for an entry, if any.
    pub fn stored_stamp(metadata: &Metadata) -> Option<&ContentStamp> {
        metadata.get::<ContentStamp>(Self::STAMP_KEY)
    }

    /// Number of times a file has been read to compute a digest.
    pub fn digests_computed(&self) -> u64 {
        self.digests.load(Ordering::Relaxed)
    }

    fn digest(&self, path: &Path) -> io::Result<blake3::Hash> {
        self.digests.fetch_add(1, Ordering::Relaxed);
        digest_file(path)
    }
}

impl StalenessPolicy for ContentHash {
    type Evidence = ContentStamp;

    fn judge(&self, check: &FreshnessCheck<'_, ContentStamp>) -> Result<Verdict<ContentStamp>> {
        if !check.modified_since_load() {
            return Ok(Verdict::Fresh);
        }

        let Some(stamp) = check.evidence() else {
            return Ok(Verdict::Stale);
        };

        // Already verified at this timestamp
        if stamp.modified_at == check.current() {
            return Ok(Verdict::Fresh);
        }

        // An unreadable file is treated as changed
        match self.digest(check.path()) {
            Ok(actual) => {
                let stale = actual != stamp.digest;
                debug!(
                    path = %check.path().display(),
                    stale,
                    "timestamp changed, compared content digest"
                );
                Ok(if stale {
                    Verdict::Stale
                } else {
                    Verdict::Confirmed(ContentStamp {
                        modified_at: check.current(),
                        digest: actual,
                    })
                })
            }
            Err(e) => {
                warn!(path = %check.path().display(), error = %e, "digest read failed, treating as stale");
                Ok(Verdict::Stale)
            }
        }
    }

    fn gather(&self, path: &Path, modified_at: DateTime<Utc>) -> Option<ContentStamp> {
        match self.digest(path) {
            Ok(digest) => Some(ContentStamp {
                modified_at,
                digest,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not digest file before load");
                None
            }
        }
    }

    fn recall(&self, metadata: &Metadata) -> Option<ContentStamp> {
        Self::stored_stamp(metadata).copied()
    }

    fn record(&self, metadata: &mut Metadata, evidence: Option<ContentStamp>) {
        match evidence {
            Some(stamp) => metadata.insert(Self::STAMP_KEY, stamp),
            None => {
                metadata.remove(Self::STAMP_KEY);
            }
        }
    }
}

/// Streams the file through a BLAKE3 hasher.
pub fn digest_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn stamp(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_digest_file_is_deterministic() {
        let file = temp_file("1\n2\n");

        let first = digest_file(file.path()).unwrap();
        let second = digest_file(file.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, blake3::hash(b"1\n2\n"));
    }

    #[test]
    fn test_unchanged_timestamp_is_fresh_without_digest() {
        let policy = ContentHash::new();
        let check = FreshnessCheck::new(Path::new("/no/such/file"), Some(stamp(1)), stamp(1), None);

        assert_eq!(policy.judge(&check).unwrap(), Verdict::Fresh);
        assert_eq!(policy.digests_computed(), 0);
    }

    #[test]
    fn test_changed_timestamp_without_stamp_is_stale() {
        let file = temp_file("a");
        let check = FreshnessCheck::new(file.path(), Some(stamp(1)), stamp(2), None);
        assert!(ContentHash::new().judge(&check).unwrap().is_stale());
    }

    #[test]
    fn test_same_content_is_confirmed_at_new_timestamp() {
        let file = temp_file("same");
        let policy = ContentHash::new();
        let evidence = policy.gather(file.path(), stamp(1)).unwrap();

        let check = FreshnessCheck::new(file.path(), Some(stamp(1)), stamp(2), Some(&evidence));
        let expected = Verdict::Confirmed(ContentStamp {
            modified_at: stamp(2),
            digest: blake3::hash(b"same"),
        });
        assert_eq!(policy.judge(&check).unwrap(), expected);
        // Asking again gives the same verdict
        assert_eq!(policy.judge(&check).unwrap(), expected);
    }

    #[test]
    fn test_confirmed_timestamp_skips_digest() {
        let policy = ContentHash::new();
        let evidence = ContentStamp {
            modified_at: stamp(2),
            digest: blake3::hash(b"x"),
        };

        let check = FreshnessCheck::new(
            Path::new("/no/such/file"),
            Some(stamp(1)),
            stamp(2),
            Some(&evidence),
        );
        assert_eq!(policy.judge(&check).unwrap(), Verdict::Fresh);
        assert_eq!(policy.digests_computed(), 0);
    }

    #[test]
    fn test_different_content_is_stale() {
        let mut file = temp_file("before");
        let policy = ContentHash::new();
        let evidence = policy.gather(file.path(), stamp(1)).unwrap();

        file.write_all(b" and after").unwrap();
        file.flush().unwrap();

        let check = FreshnessCheck::new(file.path(), Some(stamp(1)), stamp(2), Some(&evidence));
        assert!(policy.judge(&check).unwrap().is_stale());
    }

    #[test]
    fn test_unreadable_file_is_stale() {
        let evidence = ContentStamp {
            modified_at: stamp(1),
            digest: blake3::hash(b"x"),
        };

        let check = FreshnessCheck::new(
            Path::new("/no/such/file"),
            Some(stamp(1)),
            stamp(2),
            Some(&evidence),
        );
        assert!(ContentHash::new().judge(&check).unwrap().is_stale());
    }

    #[test]
    fn test_gather_failure_yields_no_stamp() {
        let policy = ContentHash::new();
        assert!(policy.gather(Path::new("/no/such/file"), stamp(1)).is_none());
        assert_eq!(policy.digests_computed(), 1);
    }

    #[test]
    fn test_record_and_recall() {
        let policy = ContentHash::new();
        let mut metadata = Metadata::new();
        let evidence = ContentStamp {
            modified_at: stamp(3),
            digest: blake3::hash(b"x"),
        };

        policy.record(&mut metadata, Some(evidence));
        assert_eq!(policy.recall(&metadata), Some(evidence));

        policy.record(&mut metadata, None);
        assert!(ContentHash::stored_stamp(&metadata).is_none());
    }
}
