//! Cache key derivation
//!
//! Keys have three underscore-separated components:
//!
//! ```text
//! {resource}_{scope}_{principal_hash}
//! ```
//!
//! The scope component is the request's scope parameters (owner, repo,
//! filters...) joined with `-` and sanitized to filesystem-safe characters;
//! when it grows past a fixed limit it is replaced by a SHA-256 digest of
//! itself rather than truncated, so distinct scopes never collide through a
//! shared prefix. The principal component is a one-way digest of the caller's
//! access token, which is the only form in which the token ever reaches a key,
//! a filename, or a log line. Keeping resource and principal as discrete
//! components is what lets invalidation match on them with plain string
//! predicates.

use sha2::{Digest, Sha256};

use crate::types::ResourceKind;

/// Length of the hex-encoded principal hash embedded in keys
const PRINCIPAL_HASH_LEN: usize = 16;
/// Scope components longer than this are hashed down
const MAX_SCOPE_LEN: usize = 80;
/// Length of the hex digest a long scope collapses to
const SCOPE_DIGEST_LEN: usize = 32;

/// A derived cache key, safe to use directly as a filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    text: String,
    principal_hash: String,
}

impl CacheKey {
    /// Derive the key for `(resource, scope params, access token)`.
    ///
    /// Deterministic: the same inputs always produce the same key. Output
    /// length is bounded regardless of token or scope length.
    pub fn build(resource: ResourceKind, scope: &[&str], raw_token: &str) -> Self {
        let principal_hash = Self::hash_token(raw_token);

        let joined = if scope.is_empty() {
            "all".to_string()
        } else {
            scope
                .iter()
                .map(|part| sanitize(part))
                .collect::<Vec<_>>()
                .join("-")
        };
        let scope_part = if joined.len() > MAX_SCOPE_LEN {
            let mut hasher = Sha256::new();
            hasher.update(joined.as_bytes());
            hex::encode(hasher.finalize())[..SCOPE_DIGEST_LEN].to_string()
        } else {
            joined
        };

        Self {
            text: format!("{}_{}_{}", resource.as_str(), scope_part, principal_hash),
            principal_hash,
        }
    }

    /// One-way digest of an access token, as embedded in keys
    pub fn hash_token(raw_token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        hex::encode(hasher.finalize())[..PRINCIPAL_HASH_LEN].to_string()
    }

    /// Extract the principal component from a stored key's text.
    ///
    /// Returns `None` for strings that do not follow the key format, so stray
    /// files in the cache directory never match an invalidation predicate.
    pub fn principal_component(key_text: &str) -> Option<&str> {
        let (_, principal) = key_text.rsplit_once('_')?;
        (principal.len() == PRINCIPAL_HASH_LEN
            && principal.chars().all(|c| c.is_ascii_hexdigit()))
        .then_some(principal)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn principal_hash(&self) -> &str {
        &self.principal_hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Map a scope parameter to filesystem-safe characters.
///
/// `_` also maps to `-` so it stays reserved as the key component separator.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
