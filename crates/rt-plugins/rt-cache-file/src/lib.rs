//! # rt-cache-file
//!
//! `LocalCache` backed by a single JSON object on disk. The whole map is
//! rewritten on every change via a temp file and rename, so a crash leaves
//! either the old or the new contents.

use async_trait::async_trait;
use rt_core::error::{AppError, Result};
use rt_core::traits::LocalCache;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

pub struct FileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

fn io_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("local cache: {e}"))
}

impl FileCache {
    /// Opens the cache at `path`. A missing file is an empty cache; an
    /// unreadable one is logged and replaced on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_error(e)),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "local cache opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let body = serde_json::to_vec_pretty(entries).map_err(io_error)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).await.map_err(io_error)?;
        fs::rename(&tmp, &self.path).await.map_err(io_error)
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cache.json");

        let cache = FileCache::open(&path).await.unwrap();
        cache.put("search_history", "[]".into()).await.unwrap();
        cache.put("gone", "x".into()).await.unwrap();
        cache.remove("gone").await.unwrap();
        drop(cache);

        let reopened = FileCache::open(&path).await.unwrap();
        assert_eq!(reopened.get("search_history").await.unwrap().as_deref(), Some("[]"));
        assert!(reopened.get("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = FileCache::open(&path).await.unwrap();
        assert!(cache.get("anything").await.unwrap().is_none());
        cache.put("k", "v".into()).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"k\""));
    }
}
