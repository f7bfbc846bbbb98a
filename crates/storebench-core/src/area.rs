//! Extension-scoped key-value storage.

use std::{
    collections::BTreeMap,
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tokio::{fs, sync::Mutex};

const SNAPSHOT_FILE: &str = "local-area.json";

/// An asynchronous string key-value area: every call is a separate
/// round trip to the backing store.
pub trait KeyValueArea: Send + Sync {
    fn clear(&self) -> impl Future<Output = Result<(), AreaError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), AreaError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, AreaError>> + Send;

    fn len(&self) -> impl Future<Output = Result<usize, AreaError>> + Send;
}

/// Reference [`KeyValueArea`]: an ordered map, optionally snapshotted to
/// `<root>/local-area.json` after every mutation.
#[derive(Clone, Debug, Default)]
pub struct LocalArea {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    snapshot: Option<PathBuf>,
    quota_bytes: Option<usize>,
}

impl LocalArea {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, AreaError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        let snapshot = root.join(SNAPSHOT_FILE);

        let entries = match fs::read(&snapshot).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(AreaError::from(err)),
        };

        Ok(Self {
            entries: Arc::new(Mutex::new(entries)),
            snapshot: Some(snapshot),
            quota_bytes: None,
        })
    }

    /// Caps the summed length of all keys and values.
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), AreaError> {
        if let Some(path) = &self.snapshot {
            let bytes = serde_json::to_vec(entries)?;
            fs::write(path, bytes).await?;
        }
        Ok(())
    }
}

impl KeyValueArea for LocalArea {
    async fn clear(&self) -> Result<(), AreaError> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.persist(&entries).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AreaError> {
        let mut entries = self.entries.lock().await;

        if let Some(limit) = self.quota_bytes {
            let used = bytes_in_use(&entries);
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let requested = used - replaced + key.len() + value.len();
            if requested > limit {
                return Err(AreaError::QuotaExceeded { requested, limit });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AreaError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn len(&self) -> Result<usize, AreaError> {
        Ok(self.entries.lock().await.len())
    }
}

fn bytes_in_use(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(key, value)| key.len() + value.len()).sum()
}

#[derive(Debug, Error)]
pub enum AreaError {
    #[error("quota exceeded: {requested} bytes requested, limit is {limit}")]
    QuotaExceeded { requested: usize, limit: usize },
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
