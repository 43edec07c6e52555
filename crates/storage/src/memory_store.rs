use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::adapter::{KeyValueStore, StorageError, StorageKey};

/// In-process backend keeping serialized payloads in memory.  
/// 將序列化內容保存在記憶體中的後端，供測試與無法寫入磁碟時使用。
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn read_raw(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write_raw(&self, key: &StorageKey, payload: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.clone(), payload.to_string());
        Ok(())
    }

    fn remove(&self, key: &StorageKey) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<StorageKey>, StorageError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
