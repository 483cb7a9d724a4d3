use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// String key/value persistence in the shape of browser local storage
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

/// In-process storage, lost on drop
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.keys().cloned().collect())
    }
}

const ENTRY_EXTENSION: &str = "json";

/// Longest file stem written verbatim; leaves room for extensions under the
/// common 255 byte file name limit
const MAX_PLAIN_STEM: usize = 200;

/// Marks digest-named files. Not part of the URL-safe base64 alphabet.
const DIGEST_MARKER: char = '~';

/// Body of a digest-named file, which cannot carry its key in the name
#[derive(Debug, Serialize, Deserialize)]
struct KeyedEntry {
    key: String,
    value: String,
}

/// One file per key under a root directory.
///
/// File names are the URL-safe base64 of the key, so arbitrary URLs map to
/// portable names and `keys()` can recover them. Keys too long for a file
/// name are stored under `~<sha256>.json` with the key kept in the file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            tracing::debug!("Creating storage directory {}", root.display());
            std::fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    /// Platform data directory for pagecheck, e.g. `~/.local/share/pagecheck`
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("pagecheck"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let stem = match Self::plain_stem(key) {
            Some(stem) => stem,
            None => Self::digest_stem(key),
        };
        self.root.join(format!("{}.{}", stem, ENTRY_EXTENSION))
    }

    fn plain_stem(key: &str) -> Option<String> {
        let stem = URL_SAFE_NO_PAD.encode(key.as_bytes());
        (stem.len() <= MAX_PLAIN_STEM).then_some(stem)
    }

    fn digest_stem(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        format!("{}{}", DIGEST_MARKER, URL_SAFE_NO_PAD.encode(digest))
    }

    fn is_digest_path(path: &Path) -> bool {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.starts_with(DIGEST_MARKER))
    }

    fn key_for(path: &Path) -> Result<String> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::Corrupt(format!("Unreadable file name {}", path.display())))?;
        if stem.starts_with(DIGEST_MARKER) {
            let entry: KeyedEntry = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            return Ok(entry.key);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(stem)
            .map_err(|e| Error::Corrupt(format!("{}: {}", path.display(), e)))?;
        String::from_utf8(bytes).map_err(|e| Error::Corrupt(format!("{}: {}", path.display(), e)))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !Self::is_digest_path(&path) {
            return Ok(Some(contents));
        }

        let entry: KeyedEntry = serde_json::from_str(&contents)?;
        if entry.key != key {
            return Err(Error::Corrupt(format!(
                "{} holds a different key",
                path.display()
            )));
        }
        Ok(Some(entry.value))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let contents = if Self::is_digest_path(&path) {
            serde_json::to_string(&KeyedEntry {
                key: key.to_string(),
                value: value.to_string(),
            })?
        } else {
            value.to_string()
        };
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match Self::key_for(&path) {
                Ok(key) => keys.push(key),
                Err(e) => tracing::debug!("Skipping foreign file: {}", e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        assert_eq!(storage.get_item("a").unwrap(), Some("1".to_string()));
        assert_eq!(storage.keys().unwrap(), vec!["a", "b"]);

        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested").join("store");

        assert!(!root.exists());
        let storage = FileStorage::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(storage.root(), root.as_path());
    }

    #[test]
    fn test_file_storage_handles_url_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let key = "pagecheck-https://example.com/a/b?c=d_mobile";

        storage.set_item(key, "{\"x\":1}").unwrap();

        assert_eq!(storage.get_item(key).unwrap(), Some("{\"x\":1}".to_string()));
        assert_eq!(storage.keys().unwrap(), vec![key.to_string()]);
    }

    #[test]
    fn test_file_storage_missing_and_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        assert_eq!(storage.get_item("missing").unwrap(), None);
        storage.remove_item("missing").unwrap();

        storage.set_item("k", "old").unwrap();
        storage.set_item("k", "new").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), Some("new".to_string()));
    }

    #[test]
    fn test_file_storage_long_key_uses_digest_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        let key = format!("pagecheck-https://example.com/?q={}_mobile", "x".repeat(400));

        storage.set_item(&key, "{\"x\":1}").unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with('~'));
        assert!(names[0].len() < 64);

        assert_eq!(storage.get_item(&key).unwrap(), Some("{\"x\":1}".to_string()));
        assert_eq!(storage.keys().unwrap(), vec![key.clone()]);

        storage.remove_item(&key).unwrap();
        assert_eq!(storage.get_item(&key).unwrap(), None);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_storage_ignores_foreign_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(temp_dir.path().join("!!!.json"), "{}").unwrap();
        std::fs::write(temp_dir.path().join("~bogus.json"), "not json").unwrap();
        storage.set_item("real", "1").unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["real".to_string()]);
    }
}
