//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of GitHub resource a cached response belongs to.
///
/// Each kind carries its own freshness window (see
/// [`CacheConfig::ttl_for`](crate::CacheConfig::ttl_for)) and prefixes the
/// cache key, so invalidation and on-disk filenames stay grouped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Repository listings and metadata (changes rarely)
    Repositories,
    /// Issue listings (changes often)
    Issues,
}

impl ResourceKind {
    /// Short identifier used in cache keys and filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repositories => "repos",
            Self::Issues => "issues",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached upstream response.
///
/// This is also the on-disk JSON schema: one file per entry containing the
/// payload, its write timestamp, the TTL that was in force at write time, and
/// the upstream ETag when one was provided. Storing the TTL inside the entry
/// keeps old entries self-describing even if the TTL policy later changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The upstream response payload, kept opaque
    pub data: serde_json::Value,
    /// Write time as epoch milliseconds
    pub timestamp: i64,
    /// Freshness window in seconds, resolved at write time
    pub ttl_secs: u64,
    /// Upstream ETag, stored for future conditional revalidation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(data: serde_json::Value, ttl_secs: u64, etag: Option<String>) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
            ttl_secs,
            etag,
        }
    }

    /// An entry is valid while `now - timestamp < ttl`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - self.timestamp >= (self.ttl_secs as i64).saturating_mul(1000)
    }
}

/// Statistics about the cache, exposed to administrative handlers
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// False when the cache is globally bypassed via configuration
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 when there have been no accesses
    pub hit_rate: f64,
    pub memory_entries: usize,
    pub durable_entries: usize,
    /// Total size of the on-disk cache files
    pub approximate_size_bytes: u64,
    /// When the last cleanup sweep completed, if any
    pub last_cleanup: Option<DateTime<Utc>>,
    /// Every hit is an upstream request that was not made
    pub estimated_api_calls_saved: u64,
    /// `hits * (assumed upstream latency - average observed hit latency)`
    pub estimated_time_saved_ms: f64,
}

/// Granularity actually applied by an invalidation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationScope {
    /// Every entry in both tiers
    All,
    /// Every entry belonging to one principal
    Principal,
    /// A single (resource, scope, principal) entry
    Exact,
}

/// Outcome of an invalidation call, reported back to the administrative
/// caller so the applied granularity is always visible.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationReport {
    pub scope: InvalidationScope,
    pub memory_removed: u64,
    pub durable_removed: u64,
}

/// Outcome of a cleanup sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub memory_removed: u64,
    pub durable_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_entry_expiry_window() {
        let entry = CacheEntry::new(json!({"id": 1}), 300, None);
        let written = DateTime::from_timestamp_millis(entry.timestamp).unwrap();

        assert!(!entry.is_expired(written));
        assert!(!entry.is_expired(written + Duration::seconds(299)));
        assert!(entry.is_expired(written + Duration::seconds(300)));
        assert!(entry.is_expired(written + Duration::seconds(301)));
    }

    #[test]
    fn test_entry_serialization_omits_missing_etag() {
        let entry = CacheEntry::new(json!([1, 2, 3]), 60, None);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("etag"));

        let entry = CacheEntry::new(json!([1, 2, 3]), 60, Some("W/\"abc\"".to_string()));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("etag"));

        let parsed: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.etag.as_deref(), Some("W/\"abc\""));
        assert_eq!(parsed.ttl_secs, 60);
    }

    #[test]
    fn test_entry_schema_requires_timestamp_and_ttl() {
        // Files written by older builds without a TTL are treated as a miss
        let err = serde_json::from_str::<CacheEntry>(r#"{"data": {}, "timestamp": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_resource_kind_identifiers() {
        assert_eq!(ResourceKind::Repositories.as_str(), "repos");
        assert_eq!(ResourceKind::Issues.as_str(), "issues");
        assert_eq!(ResourceKind::Issues.to_string(), "issues");
    }
}
