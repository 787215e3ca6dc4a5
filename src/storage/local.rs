//! Local filesystem and in-memory key/value stores.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── session.json          # Flat JSON object of string values
//! ```
//!
//! Writes go to a temp file first and are renamed into place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

type Entries = BTreeMap<String, String>;

const SESSION_FILE: &str = "session.json";

/// File-backed store rooted at a directory.
pub struct LocalStore {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Full path of the backing file.
    pub fn path(&self) -> PathBuf {
        self.root_dir.join(SESSION_FILE)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Read all entries, empty if the file doesn't exist.
    async fn read_entries(&self) -> Result<Entries> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write all entries atomically (write to temp, then rename).
    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        let path = self.path();
        Self::ensure_dir(&path).await?;

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await?;
        log::debug!("Stored '{}' in {}", key, self.path().display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries).await?;
            log::debug!("Removed '{}' from {}", key, self.path().display());
        }
        Ok(())
    }
}

/// Volatile store, used when nothing should touch the disk.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
