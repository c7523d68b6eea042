//! Animation asset cache.
//!
//! Remembers the Bot API reference of the uploaded welcome animation in a
//! small JSON file (`{"file_id": "..."}`) so the binary is uploaded once,
//! not on every greeting.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use beacon_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_id: Option<String>,
}

/// File-backed cache for one asset reference.
#[derive(Debug)]
pub struct AssetCache {
    asset: PathBuf,
    path: PathBuf,
    reference: RwLock<Option<String>>,
}

impl AssetCache {
    /// Open the cache for `asset`, reading any reference stored at `path`.
    ///
    /// A missing or unreadable file is a cache miss, never an error.
    pub async fn open(asset: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let reference = load(&path).await;
        Self {
            asset: asset.into(),
            path,
            reference: RwLock::new(reference),
        }
    }

    /// Local asset this cache describes.
    #[must_use]
    pub fn asset(&self) -> &Path {
        &self.asset
    }

    /// Cached reference, if any.
    #[must_use]
    pub fn reference(&self) -> Option<String> {
        self.reference
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a new reference in memory and on disk.
    ///
    /// The in-memory value is updated even when the write fails, so the
    /// running process still reuses the upload.
    pub async fn save(&self, reference: &str) -> AppResult<()> {
        *self
            .reference
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(reference.to_string());
        save(&self.path, reference).await
    }
}

/// Read the stored reference from `path`.
pub async fn load(path: &Path) -> Option<String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No asset cache file");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read asset cache, treating as miss");
            return None;
        }
    };

    match serde_json::from_slice::<CacheRecord>(&bytes) {
        Ok(record) => {
            if let Some(file_id) = &record.file_id {
                info!(path = %path.display(), file_id = %file_id, "Loaded cached asset reference");
            }
            record.file_id
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt asset cache, treating as miss");
            None
        }
    }
}

/// Overwrite the file at `path` with `reference`.
pub async fn save(path: &Path, reference: &str) -> AppResult<()> {
    let record = CacheRecord {
        file_id: Some(reference.to_string()),
    };
    let body = serde_json::to_vec(&record).map_err(|e| AppError::Internal(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await?;

    info!(path = %path.display(), file_id = %reference, "Saved asset reference");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open("welcome.mp4", dir.path().join("cache.json")).await;

        assert_eq!(cache.reference(), None);
    }

    #[tokio::test]
    async fn test_round_trip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = AssetCache::open("welcome.mp4", &path).await;
        cache.save("abc123").await.unwrap();
        assert_eq!(cache.reference().as_deref(), Some("abc123"));

        let reopened = AssetCache::open("welcome.mp4", &path).await;
        assert_eq!(reopened.reference().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        assert_eq!(load(&path).await, None);
    }

    #[tokio::test]
    async fn test_absent_field_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"{}").await.unwrap();

        assert_eq!(load(&path).await, None);
    }

    #[tokio::test]
    async fn test_save_writes_single_field_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        save(&path, "CgACAgQ").await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"file_id": "CgACAgQ"}));
    }

    #[tokio::test]
    async fn test_save_failure_still_updates_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file makes the write fail.
        let path = dir.path().join("cache.json");
        tokio::fs::create_dir(&path).await.unwrap();

        let cache = AssetCache::open("welcome.mp4", &path).await;
        assert!(cache.save("abc123").await.is_err());
        assert_eq!(cache.reference().as_deref(), Some("abc123"));
    }
}
