//! Key-value persistence with two scopes, mirroring synced and local
//! extension storage.
//!
//! Files live in the config directory:
//!   macOS:   ~/Library/Application Support/snipping-tool/
//!   Linux:   ~/.config/snipping-tool/
//!   Windows: %APPDATA%/snipping-tool/

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Follows the user across installs (settings, enablement).
    Sync,
    /// This install only (history, usage counters).
    Local,
}

impl StorageArea {
    fn file_name(&self) -> &'static str {
        match self {
            StorageArea::Sync => "sync.json",
            StorageArea::Local => "local.json",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned")]
    Poisoned,
}

pub trait Storage {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Volatile storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<(StorageArea, String), Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(&(area, key.to_string())).cloned())
    }

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert((area, key.to_string()), value);
        Ok(())
    }
}

/// One JSON object per area on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, area: StorageArea) -> PathBuf {
        self.dir.join(area.file_name())
    }

    fn load(&self, area: StorageArea) -> Result<Map<String, Value>, StorageError> {
        let path = self.path(area);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt { path, source })
    }
}

impl Storage for FileStorage {
    fn get(&self, area: StorageArea, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load(area)?.remove(key))
    }

    fn set(&self, area: StorageArea, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.load(area)?;
        map.insert(key.to_string(), value);

        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Write-then-rename so a crash never leaves half a file behind.
        let path = self.path(area);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&map).map_err(|source| StorageError::Corrupt {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&tmp, body).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })?;

        log::debug!("[STORAGE] {:?}.{} written", area, key);
        Ok(())
    }
}
