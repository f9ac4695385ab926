//! Error types for cache operations

use std::fmt;

/// Errors that can occur during administrative cache operations.
///
/// The read and write paths never return these: read failures degrade to a
/// cache miss and durable write failures are logged and swallowed. Only
/// operations that scan the cache directory (invalidation, sweeps) surface
/// errors, and only when the scan itself cannot start.
#[derive(Debug)]
pub enum CacheError {
    /// Filesystem operation failed
    Io(std::io::Error),
    /// Failed to serialize or deserialize an entry
    Json(serde_json::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cache I/O error: {}", e),
            Self::Json(e) => write!(f, "cache serialization error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
