use std::sync::Arc;

use minidesk_storage::{
    get_async, keys, FileStore, KeyValueStoreExt, LoadPoll, MemoryStore, SharedStore,
};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Blob {
    items: Vec<String>,
}

#[test]
fn async_read_delivers_stored_value() {
    let dir = tempdir().unwrap();
    let backend = FileStore::new(dir.path());
    let blob = Blob {
        items: vec!["milk".into(), "eggs".into()],
    };
    backend.put(&keys::SHOPPING, &blob).unwrap();

    let store: SharedStore = Arc::new(backend);
    let pending = get_async::<Blob>(&store, &keys::SHOPPING);
    assert_eq!(pending.key(), &keys::SHOPPING);
    assert_eq!(pending.wait(), Some(blob));
}

#[test]
fn async_read_of_missing_key_is_none() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let pending = get_async::<Blob>(&store, &keys::CALENDAR);
    assert_eq!(pending.wait(), None);
}

#[test]
fn async_read_resolves_at_most_once() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    store.put(&keys::TODO, &Blob { items: vec![] }).unwrap();
    let pending = get_async::<Blob>(&store, &keys::TODO);

    let mut ready = 0;
    loop {
        match pending.poll() {
            LoadPoll::Pending => std::thread::yield_now(),
            LoadPoll::Ready(value) => {
                assert!(value.is_some());
                ready += 1;
            }
            LoadPoll::Disconnected => break,
        }
    }
    assert_eq!(ready, 1);
}
