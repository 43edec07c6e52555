//! Local persistence adapter used by every MiniDesk feature store.
//! MiniDesk 各功能儲存區共用的本機持久化介面。

mod util;

pub mod adapter;
pub mod file_store;
pub mod memory_store;
pub mod pending;

pub use adapter::{
    get_async, keys, KeyValueStore, KeyValueStoreExt, SharedStore, StorageError, StorageKey,
};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use pending::{LoadPoll, PendingLoad};
