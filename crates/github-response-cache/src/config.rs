//! Cache configuration parsed from environment variables

use std::env;
use std::path::PathBuf;

use crate::types::ResourceKind;

/// Default freshness window for repository data (15 minutes)
pub const DEFAULT_REPOS_TTL_SECS: u64 = 900;
/// Default freshness window for issue data (5 minutes)
pub const DEFAULT_ISSUES_TTL_SECS: u64 = 300;
/// Assumed latency of an upstream GitHub API call, used for the
/// estimated-time-saved statistic. An assumption, not a measurement.
pub const DEFAULT_ASSUMED_UPSTREAM_LATENCY_MS: u64 = 350;

/// Cache configuration
///
/// Plain struct so tests can construct one directly; services use
/// [`CacheConfig::from_env`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the durable tier's files
    pub cache_dir: PathBuf,
    /// Globally bypass the cache: reads miss, writes are no-ops
    pub disabled: bool,
    pub repos_ttl_secs: u64,
    pub issues_ttl_secs: u64,
    /// Fixed upstream latency assumption for savings estimates
    pub assumed_upstream_latency_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/github"),
            disabled: false,
            repos_ttl_secs: DEFAULT_REPOS_TTL_SECS,
            issues_ttl_secs: DEFAULT_ISSUES_TTL_SECS,
            assumed_upstream_latency_ms: DEFAULT_ASSUMED_UPSTREAM_LATENCY_MS,
        }
    }
}

impl CacheConfig {
    /// Parse configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = env::var("GITHUB_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let disabled = env::var("GITHUB_CACHE_DISABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let repos_ttl_secs = env::var("GITHUB_CACHE_REPOS_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.repos_ttl_secs);

        let issues_ttl_secs = env::var("GITHUB_CACHE_ISSUES_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.issues_ttl_secs);

        Self {
            cache_dir,
            disabled,
            repos_ttl_secs,
            issues_ttl_secs,
            assumed_upstream_latency_ms: defaults.assumed_upstream_latency_ms,
        }
    }

    /// Freshness window for a resource kind, in seconds.
    ///
    /// Pure lookup; the resolved TTL is stored inside each entry at write
    /// time, so changing the policy never reinterprets existing entries.
    pub fn ttl_for(&self, resource: ResourceKind) -> u64 {
        match resource {
            ResourceKind::Repositories => self.repos_ttl_secs,
            ResourceKind::Issues => self.issues_ttl_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_for(ResourceKind::Repositories), 900);
        assert_eq!(config.ttl_for(ResourceKind::Issues), 300);
        assert!(!config.disabled);
    }

    #[test]
    fn test_ttl_override() {
        let config = CacheConfig {
            issues_ttl_secs: 1,
            ..CacheConfig::default()
        };
        assert_eq!(config.ttl_for(ResourceKind::Issues), 1);
        assert_eq!(config.ttl_for(ResourceKind::Repositories), 900);
    }

    #[test]
    fn test_from_env_overrides() {
        // Single env-mutating test so parallel test threads don't race
        env::set_var("GITHUB_CACHE_DIR", "/tmp/gh-cache-test");
        env::set_var("GITHUB_CACHE_DISABLED", "true");
        env::set_var("GITHUB_CACHE_REPOS_TTL_SECS", "60");
        env::set_var("GITHUB_CACHE_ISSUES_TTL_SECS", "not-a-number");

        let config = CacheConfig::from_env();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/gh-cache-test"));
        assert!(config.disabled);
        assert_eq!(config.repos_ttl_secs, 60);
        // Unparseable values fall back to the default
        assert_eq!(config.issues_ttl_secs, DEFAULT_ISSUES_TTL_SECS);

        env::remove_var("GITHUB_CACHE_DIR");
        env::remove_var("GITHUB_CACHE_DISABLED");
        env::remove_var("GITHUB_CACHE_REPOS_TTL_SECS");
        env::remove_var("GITHUB_CACHE_ISSUES_TTL_SECS");
    }
}
