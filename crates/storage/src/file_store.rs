use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::adapter::{KeyValueStore, StorageError, StorageKey};
use crate::util::write_atomic;

const EXTENSION: &str = "json";

/// Persists each key as a pretty-printed JSON file inside a data directory.  
/// 將每個鍵值以 JSON 檔案形式儲存在資料目錄中。
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Constructs a store rooted at `dir`. The directory is created lazily on first write.  
    /// 建立以 `dir` 為根的儲存器；目錄於首次寫入時建立。
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file backing `key`.
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }
}

impl KeyValueStore for FileStore {
    fn read_raw(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.clone(),
                path,
                source,
            }),
        }
    }

    fn write_raw(&self, key: &StorageKey, payload: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        write_atomic(&path, payload.as_bytes()).map_err(|source| StorageError::Write {
            key: key.clone(),
            path: path.clone(),
            source,
        })?;
        debug!(%key, path = %path.display(), bytes = payload.len(), "stored blob");
        Ok(())
    }

    fn remove(&self, key: &StorageKey) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Write {
                key: key.clone(),
                path,
                source,
            }),
        }
    }

    fn keys(&self) -> Result<Vec<StorageKey>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::List {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::List {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // Foreign files that do not form a valid key are skipped.
            if let Ok(key) = StorageKey::parse(stem) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
