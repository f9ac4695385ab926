//! Two-tier response cache with invalidation, metrics, and cleanup

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::durable::DurableTier;
use crate::error::Result;
use crate::key::CacheKey;
use crate::memory::MemoryTier;
use crate::metrics::MetricsCollector;
use crate::types::{
    CacheEntry, CacheStats, InvalidationReport, InvalidationScope, ResourceKind, SweepReport,
};

/// Response cache for the rate-limited GitHub REST API.
///
/// Constructed once at process start and shared via `Arc` in application
/// state; tests construct a fresh instance per test instead of resetting
/// shared globals. Reads consult the memory tier, then the disk tier (which
/// refills memory on a hit); on a total miss the upstream client fetches the
/// data and writes it back through [`set`](Self::set).
///
/// Cache failure never becomes an application failure: reads degrade to a
/// miss and durable writes are attempted once, logged on failure, and
/// swallowed.
pub struct GithubResponseCache {
    config: CacheConfig,
    memory: MemoryTier,
    durable: DurableTier,
    metrics: MetricsCollector,
}

impl GithubResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let durable = DurableTier::new(config.cache_dir.clone());
        Self {
            config,
            memory: MemoryTier::new(),
            durable,
            metrics: MetricsCollector::new(),
        }
    }

    /// Create the cache directory. Skipped when the cache is disabled.
    pub async fn init(&self) -> Result<()> {
        if self.config.disabled {
            info!("GitHub response cache disabled, skipping init");
            return Ok(());
        }
        self.durable.init().await
    }

    /// Look up a cached response. `None` means the caller should fetch from
    /// upstream and write the result back via [`set`](Self::set).
    pub async fn get(&self, resource: ResourceKind, scope: &[&str], raw_token: &str) -> Option<Value> {
        if self.config.disabled {
            return None;
        }

        let start = Instant::now();
        let key = CacheKey::build(resource, scope, raw_token);

        if let Some(entry) = self.memory.get(key.as_str()).await {
            self.metrics.record_hit(start.elapsed());
            debug!(key = %key, tier = "memory", "Cache hit");
            return Some(entry.data);
        }

        if let Some(entry) = self.durable.get(key.as_str()).await {
            // Warm the memory tier so the next read stays in-process
            self.memory.set(key.as_str(), entry.clone()).await;
            self.metrics.record_hit(start.elapsed());
            debug!(key = %key, tier = "durable", "Cache hit");
            return Some(entry.data);
        }

        self.metrics.record_miss();
        debug!(key = %key, "Cache miss");
        None
    }

    /// Store an upstream response in both tiers.
    ///
    /// Infallible by design: the in-memory write always succeeds and is
    /// sufficient for the operation; persistence is a single best-effort
    /// attempt with no retry.
    pub async fn set(
        &self,
        resource: ResourceKind,
        scope: &[&str],
        raw_token: &str,
        payload: Value,
        etag: Option<String>,
    ) {
        if self.config.disabled {
            return;
        }

        let key = CacheKey::build(resource, scope, raw_token);
        let entry = CacheEntry::new(payload, self.config.ttl_for(resource), etag);

        self.memory.set(key.as_str(), entry.clone()).await;

        if let Err(e) = self.durable.set(key.as_str(), &entry).await {
            warn!(key = %key, error = %e, "Failed to persist cache entry, memory tier remains authoritative");
        }
    }

    /// Administrative reset: drop everything from both tiers. Idempotent.
    pub async fn invalidate_all(&self) -> Result<InvalidationReport> {
        let memory_removed = self.memory.clear().await;
        let durable_removed = self.durable.delete_all().await?;
        info!(memory_removed, durable_removed, "Invalidated entire cache");
        Ok(InvalidationReport {
            scope: InvalidationScope::All,
            memory_removed,
            durable_removed,
        })
    }

    /// Remove every entry belonging to the principal behind `raw_token`,
    /// leaving all other principals' entries untouched.
    pub async fn invalidate_scope(&self, raw_token: &str) -> Result<InvalidationReport> {
        let principal = CacheKey::hash_token(raw_token);

        let matches = |key: &str| CacheKey::principal_component(key) == Some(principal.as_str());
        let memory_removed = self.memory.delete_matching(matches).await;
        let durable_removed = self.durable.delete_matching(matches).await?;

        info!(principal = %principal, memory_removed, durable_removed, "Invalidated principal scope");
        Ok(InvalidationReport {
            scope: InvalidationScope::Principal,
            memory_removed,
            durable_removed,
        })
    }

    /// Remove the single entry for `(resource, scope, principal)`.
    ///
    /// The key scheme resolves this granularity exactly, so no fallback to
    /// principal-wide invalidation is ever needed; the report's `scope` field
    /// states the granularity that was applied.
    pub async fn invalidate_type(
        &self,
        resource: ResourceKind,
        scope: &[&str],
        raw_token: &str,
    ) -> InvalidationReport {
        let key = CacheKey::build(resource, scope, raw_token);
        let memory_removed = self.memory.delete(key.as_str()).await as u64;
        let durable_removed = self.durable.delete(key.as_str()).await as u64;

        info!(key = %key, "Invalidated cache entry");
        InvalidationReport {
            scope: InvalidationScope::Exact,
            memory_removed,
            durable_removed,
        }
    }

    /// Remove expired entries from both tiers.
    ///
    /// Not needed for read correctness (lazy eviction and TTL checks already
    /// keep stale data from being served); this bounds growth of the durable
    /// store. Safe alongside concurrent reads and writes.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = Utc::now();
        let memory_removed = self.memory.sweep_expired(now).await;
        let durable_removed = self.durable.sweep_expired(now).await?;
        self.metrics.mark_cleanup(now);

        info!(memory_removed, durable_removed, "Cache sweep complete");
        Ok(SweepReport {
            memory_removed,
            durable_removed,
        })
    }

    /// Run [`sweep`](Self::sweep) on a fixed period until the returned task
    /// is aborted.
    pub fn spawn_periodic_sweep(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so a fresh process
            // doesn't sweep an empty cache at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = cache.sweep().await {
                    error!(error = %e, "Periodic cache sweep failed");
                }
            }
        })
    }

    /// Current counters and storage figures
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: !self.config.disabled,
            hits: self.metrics.hits(),
            misses: self.metrics.misses(),
            hit_rate: self.metrics.hit_rate(),
            memory_entries: self.memory.entry_count().await,
            durable_entries: self.durable.entry_count().await,
            approximate_size_bytes: self.durable.approximate_size_bytes().await,
            last_cleanup: self.metrics.last_cleanup(),
            estimated_api_calls_saved: self.metrics.hits(),
            estimated_time_saved_ms: self
                .metrics
                .estimated_time_saved_ms(self.config.assumed_upstream_latency_ms),
        }
    }
}
