use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Key of the persisted login flag
pub const LOGIN_KEY: &str = "isLoggedIn";

/// Key of the persisted per-column filter conditions
pub const FILTERS_KEY: &str = "filterConditions";

/// Prefix of cached payload keys; the source identity follows the colon
pub const CACHE_KEY_PREFIX: &str = "cachedData";

/// Cache key for a given source identity.
pub fn cache_key(identity: &str) -> String {
    format!("{}:{}", CACHE_KEY_PREFIX, identity)
}

/// Client-local key/value store for UI preferences and cached payloads.
///
/// A missing key always means "no prior state".
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted to a single gzip-compressed bincode file.
///
/// The whole map is read once on open and rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStorage {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            match load_entries(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("ignoring unreadable store {}: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        FileStorage { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        save_entries(&self.entries, &self.path)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

pub fn save_entries(entries: &HashMap<String, String>, filename: &Path) -> Result<(), StorageError> {
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serialize_into(&mut writer, entries)?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?.flush()?;

    Ok(())
}

pub fn load_entries(filename: &Path) -> Result<HashMap<String, String>, StorageError> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let entries: HashMap<String, String> = deserialize_from(&mut reader)?;

    Ok(entries)
}

pub fn is_logged_in(storage: &dyn Storage) -> bool {
    storage.get(LOGIN_KEY).as_deref() == Some("true")
}

pub fn set_logged_in(storage: &mut dyn Storage, logged_in: bool) -> Result<(), StorageError> {
    if logged_in {
        storage.set(LOGIN_KEY, "true".to_string())
    } else {
        storage.remove(LOGIN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("store.bin.gz");

        let mut store = FileStorage::open(&path);
        store.set(FILTERS_KEY, "{}".to_string()).unwrap();
        set_logged_in(&mut store, true).unwrap();
        assert!(path.exists(), "store file should be written on set");

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get(FILTERS_KEY).as_deref(), Some("{}"));
        assert!(is_logged_in(&reopened));
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin.gz");
        std::fs::write(&path, b"not gzip").unwrap();

        let store = FileStorage::open(&path);
        assert_eq!(store.get(LOGIN_KEY), None);
    }

    #[test]
    fn logout_removes_flag() {
        let mut store = MemoryStorage::new();
        set_logged_in(&mut store, true).unwrap();
        set_logged_in(&mut store, false).unwrap();
        assert!(!is_logged_in(&store));
        assert_eq!(cache_key("data.csv"), "cachedData:data.csv");
    }
}
