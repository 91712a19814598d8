//! Storage layer for limiter records
//!
//! Records are opaque byte blobs addressed by namespace and key. The file
//! backend keeps one JSON file per record under the data directory.

use async_trait::async_trait;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TEMP_FILE_SUFFIX: &str = "tmp";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Interface for key-value persistence backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a record; `None` if it was never written
    async fn read_record(&self, namespace: &str, key: &str)
        -> Result<Option<Vec<u8>>, StorageError>;
    /// Replace a record
    async fn write_record(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError>;
}

/// Load a JSON record.
///
/// # Errors
///
/// Returns an error if reading or JSON deserialization fails.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.read_record(namespace, key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Save a JSON record.
///
/// # Errors
///
/// Returns an error if JSON serialization or writing fails.
pub async fn save_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
    data: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(data)?;
    store.write_record(namespace, key, body).await
}

/// File-backed store: `<root>/<namespace>/<key>.json`
pub struct JsonFileStore {
    root: PathBuf,
    cache: Cache<String, Arc<Vec<u8>>>,
    /// Serializes write + rename so the last completed write wins
    write_lock: Mutex<()>,
    write_seq: AtomicU64,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_idle(Duration::from_secs(30 * 60))
            .build();

        Ok(Self {
            root,
            cache,
            write_lock: Mutex::new(()),
            write_seq: AtomicU64::new(0),
        })
    }

    /// Root directory of the store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.json"))
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn read_record(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.record_path(namespace, key);
        let cache_key = path.display().to_string();

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(Some(cached.as_ref().clone()));
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.cache
                    .insert(cache_key, Arc::new(bytes.clone()))
                    .await;
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No record at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError> {
        let path = self.record_path(namespace, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let _guard = self.write_lock.lock().await;
        // Write-Through: the cache only follows a completed rename
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{seq}.{TEMP_FILE_SUFFIX}"));
        if let Err(e) = tokio::fs::write(&tmp, &value).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            warn!("Failed to move {} into place: {}", tmp.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        self.cache
            .insert(path.display().to_string(), Arc::new(value))
            .await;
        Ok(())
    }
}

/// In-process store for tests and throwaway runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn read_record(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let records = self.records.lock().await;
        Ok(records
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn write_record(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError> {
        let mut records = self.records.lock().await;
        records.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }
}
