//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::RetentionPolicy;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of values kept alive by the cache itself
    pub max_retained: usize,
    /// Seconds a retained value stays pinned after its last access, 0 = no limit
    pub retain_ttl: u64,
    /// Background sweep task interval in seconds
    pub sweep_interval: u64,
    /// Poll interval in seconds used by the demo binary
    pub poll_interval: u64,
    /// Whether to confirm timestamp changes with a content digest
    pub content_hash: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILE_MEMO_MAX_RETAINED` - Retained value handles (default: 64)
    /// - `FILE_MEMO_RETAIN_TTL` - Retention TTL in seconds, 0 disables (default: 300)
    /// - `FILE_MEMO_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `FILE_MEMO_POLL_INTERVAL` - Demo poll frequency in seconds (default: 2)
    /// - `FILE_MEMO_CONTENT_HASH` - Use content digests (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_retained: parse_value(lookup("FILE_MEMO_MAX_RETAINED"))
                .unwrap_or(defaults.max_retained),
            retain_ttl: parse_value(lookup("FILE_MEMO_RETAIN_TTL")).unwrap_or(defaults.retain_ttl),
            sweep_interval: parse_value(lookup("FILE_MEMO_SWEEP_INTERVAL"))
                .unwrap_or(defaults.sweep_interval),
            poll_interval: parse_value(lookup("FILE_MEMO_POLL_INTERVAL"))
                .unwrap_or(defaults.poll_interval),
            content_hash: parse_value(lookup("FILE_MEMO_CONTENT_HASH"))
                .unwrap_or(defaults.content_hash),
        }
    }

    /// Builds the retention policy described by this configuration.
    pub fn retention(&self) -> RetentionPolicy {
        let ttl = (self.retain_ttl > 0).then(|| Duration::from_secs(self.retain_ttl));
        RetentionPolicy::new(self.max_retained, ttl)
    }
}

fn parse_value<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|v| v.trim().parse().ok())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_retained: 64,
            retain_ttl: 300,
            sweep_interval: 30,
            poll_interval: 2,
            content_hash: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_retained, 64);
        assert_eq!(config.retain_ttl, 300);
        assert_eq!(config.sweep_interval, 30);
        assert_eq!(config.poll_interval, 2);
        assert!(config.content_hash);
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = CacheConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.max_retained, 64);
        assert_eq!(config.retain_ttl, 300);
        assert_eq!(config.sweep_interval, 30);
        assert_eq!(config.poll_interval, 2);
        assert!(config.content_hash);
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("FILE_MEMO_MAX_RETAINED", "8"),
            ("FILE_MEMO_RETAIN_TTL", " 0 "),
            ("FILE_MEMO_SWEEP_INTERVAL", "5"),
            ("FILE_MEMO_POLL_INTERVAL", "1"),
            ("FILE_MEMO_CONTENT_HASH", "false"),
        ]));
        assert_eq!(config.max_retained, 8);
        assert_eq!(config.retain_ttl, 0);
        assert_eq!(config.sweep_interval, 5);
        assert_eq!(config.poll_interval, 1);
        assert!(!config.content_hash);
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("FILE_MEMO_MAX_RETAINED", "-1"),
            ("FILE_MEMO_SWEEP_INTERVAL", "soon"),
            ("FILE_MEMO_CONTENT_HASH", "yes"),
        ]));
        assert_eq!(config.max_retained, 64);
        assert_eq!(config.sweep_interval, 30);
        assert!(config.content_hash);
    }

    #[test]
    fn test_retention_from_config() {
        let config = CacheConfig {
            max_retained: 8,
            retain_ttl: 0,
            ..CacheConfig::default()
        };
        let retention = config.retention();
        assert_eq!(retention.max_retained, 8);
        assert!(retention.ttl.is_none());

        let config = CacheConfig::default();
        assert_eq!(config.retention().ttl, Some(Duration::from_secs(300)));
    }
}
