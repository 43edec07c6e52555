use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::pending::PendingLoad;

/// Feature-scoped keys under which each store persists its blob.
/// 各功能儲存區使用的持久化鍵值。
pub mod keys {
    use super::StorageKey;

    pub const TODO: StorageKey = StorageKey::from_static("minidesk.todo");
    pub const SHOPPING: StorageKey = StorageKey::from_static("minidesk.shopping");
    pub const NOTES: StorageKey = StorageKey::from_static("minidesk.notes");
    pub const FINANCE: StorageKey = StorageKey::from_static("minidesk.finance");
    pub const EXPENSES: StorageKey = StorageKey::from_static("minidesk.expenses");
    pub const CALENDAR: StorageKey = StorageKey::from_static("minidesk.calendar");
}

/// Name of a persisted blob. Keys double as file names for [`crate::FileStore`], so only
/// ASCII alphanumerics plus `.`, `_` and `-` are accepted.
/// 持久化資料的名稱；同時作為檔名使用，因此僅接受 ASCII 英數與 `.`、`_`、`-`。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(Cow<'static, str>);

impl StorageKey {
    /// Wraps a compile-time key. The literal must already satisfy [`StorageKey::parse`].
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// Validates and wraps a runtime key.
    /// 驗證並建立執行期鍵值。
    pub fn parse(key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if valid {
            Ok(Self(Cow::Owned(key)))
        } else {
            Err(StorageError::InvalidKey(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised by persistence backends.
/// 持久化後端可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("failed to read {key} from {path}: {source}")]
    Read {
        key: StorageKey,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {key} to {path}: {source}")]
    Write {
        key: StorageKey,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list stored keys in {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored value for {key} is corrupt: {source}")]
    Corrupt {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw key-value backend holding JSON payloads.
/// 保存 JSON 內容的原始鍵值後端。
///
/// Typed access lives in [`KeyValueStoreExt`], which is implemented for every backend
/// (including `dyn KeyValueStore`).
pub trait KeyValueStore: Send + Sync {
    fn read_raw(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

    fn write_raw(&self, key: &StorageKey, payload: &str) -> Result<(), StorageError>;

    /// Removes a blob, returning `true` when something was deleted.
    fn remove(&self, key: &StorageKey) -> Result<bool, StorageError>;

    /// Lists stored keys in ascending order.
    fn keys(&self) -> Result<Vec<StorageKey>, StorageError>;
}

/// Typed helpers layered over [`KeyValueStore`].
/// 建構於 [`KeyValueStore`] 之上的型別化輔助函式。
pub trait KeyValueStoreExt: KeyValueStore {
    /// Reads and decodes a blob, reporting corrupt payloads as errors.
    fn try_get<T: DeserializeOwned>(&self, key: &StorageKey) -> Result<Option<T>, StorageError> {
        match self.read_raw(key)? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|source| StorageError::Corrupt {
                    key: key.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Reads a blob synchronously. Missing, unreadable and corrupt data all yield `None`;
    /// the latter two are logged.
    fn get_sync<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(%key, error = %err, "ignoring unreadable stored value");
                None
            }
        }
    }

    fn put<T: Serialize + ?Sized>(&self, key: &StorageKey, value: &T) -> Result<(), StorageError> {
        let payload =
            serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialize {
                key: key.clone(),
                source,
            })?;
        self.write_raw(key, &payload)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Shared handle used by hosts that hand the backend to background readers.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Starts a background read of `key`; the result is delivered once through the returned
/// [`PendingLoad`].
/// 於背景執行緒讀取 `key`，結果僅透過 [`PendingLoad`] 傳遞一次。
pub fn get_async<T>(store: &SharedStore, key: &StorageKey) -> PendingLoad<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    let store = Arc::clone(store);
    let thread_key = key.clone();
    std::thread::spawn(move || {
        let value = store.get_sync::<T>(&thread_key);
        // The receiver may already be gone when its host was torn down.
        let _ = tx.send(value);
    });
    PendingLoad::new(key.clone(), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_path_like_keys() {
        assert!(StorageKey::parse("minidesk.notes").is_ok());
        assert!(StorageKey::parse("finance_2024-q1").is_ok());
        for bad in ["", "../escape", "a/b", ".hidden", "with space"] {
            assert!(
                matches!(StorageKey::parse(bad), Err(StorageError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn static_keys_are_valid() {
        for key in [
            keys::TODO,
            keys::SHOPPING,
            keys::NOTES,
            keys::FINANCE,
            keys::EXPENSES,
            keys::CALENDAR,
        ] {
            assert_eq!(StorageKey::parse(key.as_str()).unwrap(), key);
        }
    }
}
