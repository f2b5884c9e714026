//! Key-value storage scopes and change watching.
//!
//! Two scopes mirror a browser's storage: [`MemoryStore`] lives as long as
//! the process (the "tab" scope) and [`FileStore`] survives restarts (the
//! durable scope). A [`StorageWatcher`] reports writes made by other
//! processes sharing the durable directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be (de)serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for keyfeed_types::ApiError {
    fn from(err: StorageError) -> Self {
        keyfeed_types::ApiError::Storage(err.to_string())
    }
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Durable store: one file per key in a directory.
///
/// Files are written with 0600 permissions on Unix since they hold the
/// access token.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, value)?;
        set_file_permissions_0600(&path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
#[cfg(unix)]
fn set_file_permissions_0600(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_file_permissions_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// A key changed outside this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// The changed key.
    pub key: String,
}

/// Source of external storage changes.
#[async_trait]
pub trait StorageWatcher: Send {
    /// Wait for the next change. `None` means no more changes will come.
    async fn next_change(&mut self) -> Option<StorageChange>;
}

/// Watcher for stores nothing else can write to.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatcher;

#[async_trait]
impl StorageWatcher for NoopWatcher {
    async fn next_change(&mut self) -> Option<StorageChange> {
        None
    }
}

/// Polls modification times of a [`FileStore`]'s files.
#[derive(Debug)]
pub struct PollingWatcher {
    store: FileStore,
    keys: Vec<String>,
    interval: Duration,
    seen: HashMap<String, Option<SystemTime>>,
}

impl PollingWatcher {
    /// Watch `keys` of `store`, checking every `interval`.
    pub fn new(store: FileStore, keys: &[&str], interval: Duration) -> Self {
        let mut watcher = Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            store,
            interval,
            seen: HashMap::new(),
        };
        for key in watcher.keys.clone() {
            let stamp = watcher.stamp(&key);
            watcher.seen.insert(key, stamp);
        }
        watcher
    }

    fn stamp(&self, key: &str) -> Option<SystemTime> {
        fs::metadata(self.store.path_for(key))
            .and_then(|m| m.modified())
            .ok()
    }

    fn poll_once(&mut self) -> Option<StorageChange> {
        for key in &self.keys {
            let stamp = fs::metadata(self.store.path_for(key))
                .and_then(|m| m.modified())
                .ok();
            let previous = self.seen.insert(key.clone(), stamp);
            if previous.flatten() != stamp {
                return Some(StorageChange { key: key.clone() });
            }
        }
        None
    }
}

#[async_trait]
impl StorageWatcher for PollingWatcher {
    async fn next_change(&mut self) -> Option<StorageChange> {
        loop {
            if let Some(change) = self.poll_once() {
                return Some(change);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
