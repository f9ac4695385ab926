//! Two-tier response cache for the rate-limited GitHub REST API
//!
//! Sits between the application and GitHub to cut redundant upstream calls:
//! a fast in-process tier backed by a durable one-file-per-entry tier that
//! survives restarts. Entries are scoped per principal (a one-way hash of the
//! caller's access token, never the token itself), carry their TTL with them,
//! and can be invalidated globally, per principal, or per resource scope.
//! Cache failure never fails the caller: reads degrade to a miss and durable
//! writes are best-effort.
//!
//! # Example
//!
//! ```no_run
//! use github_response_cache::{CacheConfig, GithubResponseCache, ResourceKind};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), github_response_cache::CacheError> {
//! let cache = GithubResponseCache::new(CacheConfig::from_env());
//! cache.init().await?;
//!
//! let scope = ["octocat", "hello-world", "open"];
//! match cache.get(ResourceKind::Issues, &scope, "gho_token").await {
//!     Some(issues) => println!("served from cache: {issues}"),
//!     None => {
//!         // Fetch from the GitHub client, then write back through the cache
//!         let fetched = json!([{"id": 1, "title": "login flow regression"}]);
//!         cache
//!             .set(ResourceKind::Issues, &scope, "gho_token", fetched, None)
//!             .await;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod durable;
mod error;
mod key;
mod memory;
mod metrics;
mod types;

pub use cache::GithubResponseCache;
pub use config::{
    CacheConfig, DEFAULT_ASSUMED_UPSTREAM_LATENCY_MS, DEFAULT_ISSUES_TTL_SECS,
    DEFAULT_REPOS_TTL_SECS,
};
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use types::{
    CacheEntry, CacheStats, InvalidationReport, InvalidationScope, ResourceKind, SweepReport,
};
