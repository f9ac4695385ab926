//! Durable on-disk cache tier
//!
//! One JSON file per key under the cache directory, named `{key}.json`. The
//! key is already filesystem-safe (see [`crate::key`]), so the key text is
//! the filename stem. Survives restarts and refills the memory tier on read.
//!
//! Every read failure degrades to "absent": a corrupt, unreadable, or
//! schema-mismatched file must look exactly like a miss to the caller.
//! Expired files are reported absent but left on disk for the sweeper,
//! keeping the read path free of deletion I/O.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::types::CacheEntry;

pub struct DurableTier {
    dir: PathBuf,
}

impl DurableTier {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Ensure the cache directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        info!(cache_dir = ?self.dir, "Durable cache tier initialized");
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Recover the key from a cache filename, ignoring anything that is not
    /// a `.json` file (temp files, stray directory contents).
    fn key_from_path(path: &Path) -> Option<&str> {
        if path.extension()? != "json" {
            return None;
        }
        path.file_stem()?.to_str()
    }

    /// Look up a key. Absent on missing file, I/O error, parse error, schema
    /// mismatch, or expiry; never an error. Expired files are not deleted
    /// here (the sweeper handles them).
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache file, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cache file, treating as miss");
                return None;
            }
        };

        if entry.is_expired(Utc::now()) {
            debug!(key = %key, "Durable entry expired");
            return None;
        }

        Some(entry)
    }

    /// Write an entry to `{key}.json.tmp` and rename it into place, so a
    /// crash mid-write never leaves a half-written file visible to readers.
    pub async fn set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(key = %key, size = bytes.len(), "Persisted cache entry");
        Ok(())
    }

    /// Remove a single key's file. Missing files count as success.
    pub async fn delete(&self, key: &str) -> bool {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to delete cache file");
                false
            }
        }
    }

    /// Remove every file whose key satisfies the predicate, returning the
    /// number removed.
    ///
    /// Errors only if the directory scan cannot start; individual deletions
    /// are independent, and a file that vanished between listing and deletion
    /// counts as already done.
    pub async fn delete_matching<F>(&self, pred: F) -> Result<u64>
    where
        F: Fn(&str) -> bool,
    {
        let mut removed = 0;
        for path in self.list_files().await? {
            let Some(key) = Self::key_from_path(&path) else {
                continue;
            };
            if !pred(key) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?path, error = %e, "Failed to delete cache file"),
            }
        }
        Ok(removed)
    }

    /// Remove every cache file. Idempotent: an empty or missing directory is
    /// a successful no-op.
    pub async fn delete_all(&self) -> Result<u64> {
        self.delete_matching(|_| true).await
    }

    /// Remove files whose entries are expired as of `now`. Files that cannot
    /// be read or parsed are removed as well; they can never be served and
    /// would otherwise accumulate forever.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut removed = 0;
        for path in self.list_files().await? {
            if Self::key_from_path(&path).is_none() {
                continue;
            }

            let expired = match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) => entry.is_expired(now),
                    Err(e) => {
                        warn!(path = ?path, error = %e, "Sweeping corrupt cache file");
                        true
                    }
                },
                // Already gone, nothing to sweep
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Sweeping unreadable cache file");
                    true
                }
            };

            if expired {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = ?path, error = %e, "Failed to sweep cache file"),
                }
            }
        }
        Ok(removed)
    }

    /// Number of cache files currently on disk, including expired ones
    pub async fn entry_count(&self) -> usize {
        match self.list_files().await {
            Ok(paths) => paths
                .iter()
                .filter(|p| Self::key_from_path(p).is_some())
                .count(),
            Err(_) => 0,
        }
    }

    /// Total size of all cache files; 0 if the directory cannot be read
    pub async fn approximate_size_bytes(&self) -> u64 {
        let Ok(paths) = self.list_files().await else {
            return 0;
        };
        let mut total = 0;
        for path in paths {
            if let Ok(meta) = fs::metadata(&path).await {
                total += meta.len();
            }
        }
        total
    }

    /// List the cache directory. A missing directory reads as empty, so
    /// administrative operations stay idempotent before first init.
    async fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::Io(e)),
        };

        let mut paths = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            paths.push(item.path());
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(json!({"id": 7}), ttl_secs, Some("W/\"x\"".into()))
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        tier.set("issues_o-r_aaaa", &entry(60)).await.unwrap();
        let got = tier.get("issues_o-r_aaaa").await.unwrap();
        assert_eq!(got.data, json!({"id": 7}));
        assert_eq!(got.etag.as_deref(), Some("W/\"x\""));

        // File lands at the documented location
        assert!(dir.path().join("issues_o-r_aaaa.json").exists());
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        tier.set("repos_all_bbbb", &entry(60)).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["repos_all_bbbb.json"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_miss() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        std::fs::write(dir.path().join("issues_o-r_cccc.json"), b"{not json!").unwrap();
        assert!(tier.get("issues_o-r_cccc").await.is_none());

        // Schema mismatch reads as a miss too
        std::fs::write(dir.path().join("issues_o-r_dddd.json"), b"{\"data\": 1}").unwrap();
        assert!(tier.get("issues_o-r_dddd").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_absent_but_not_deleted() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        let mut stale = entry(1);
        stale.timestamp = (Utc::now() - Duration::seconds(10)).timestamp_millis();
        tier.set("issues_o-r_eeee", &stale).await.unwrap();

        assert!(tier.get("issues_o-r_eeee").await.is_none());
        // Left on disk for the sweeper
        assert!(dir.path().join("issues_o-r_eeee.json").exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_and_corrupt() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        let mut stale = entry(1);
        stale.timestamp = (Utc::now() - Duration::seconds(10)).timestamp_millis();
        tier.set("issues_old_aaaa", &stale).await.unwrap();
        tier.set("issues_new_aaaa", &entry(600)).await.unwrap();
        std::fs::write(dir.path().join("issues_bad_bbbb.json"), b"garbage").unwrap();

        let removed = tier.sweep_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(tier.get("issues_new_aaaa").await.is_some());
        assert_eq!(tier.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_matching_by_principal() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        tier.set("issues_o-r_aaaa", &entry(60)).await.unwrap();
        tier.set("repos_all_aaaa", &entry(60)).await.unwrap();
        tier.set("issues_o-r_bbbb", &entry(60)).await.unwrap();

        let removed = tier.delete_matching(|k| k.ends_with("_aaaa")).await.unwrap();
        assert_eq!(removed, 2);
        assert!(tier.get("issues_o-r_bbbb").await.is_some());
    }

    #[tokio::test]
    async fn test_delete_all_is_idempotent() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        tier.set("issues_o-r_aaaa", &entry(60)).await.unwrap();
        assert_eq!(tier.delete_all().await.unwrap(), 1);
        assert_eq!(tier.delete_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_reads_as_empty() {
        let tier = DurableTier::new(PathBuf::from("/nonexistent/gh-cache-test"));
        assert!(tier.get("issues_o-r_aaaa").await.is_none());
        assert_eq!(tier.delete_all().await.unwrap(), 0);
        assert_eq!(tier.entry_count().await, 0);
        assert_eq!(tier.approximate_size_bytes().await, 0);
    }

    #[tokio::test]
    async fn test_size_accounting() {
        let dir = tempdir().unwrap();
        let tier = DurableTier::new(dir.path().to_path_buf());
        tier.init().await.unwrap();

        tier.set("repos_all_aaaa", &entry(60)).await.unwrap();
        let size = tier.approximate_size_bytes().await;
        let expected = std::fs::metadata(dir.path().join("repos_all_aaaa.json"))
            .unwrap()
            .len();
        assert_eq!(size, expected);
    }
}
