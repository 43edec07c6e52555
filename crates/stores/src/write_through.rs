use std::collections::HashMap;
use std::time::{Duration, Instant};

use minidesk_settings::StoragePreferences;
use minidesk_storage::{KeyValueStore, StorageError, StorageKey};
use tracing::{info, warn};

use crate::host::StoreHost;
use crate::reducer::Reducer;

#[derive(Debug, Clone, Copy)]
struct Tracked {
    saved: u64,
    seen: u64,
    changed_at: Instant,
}

/// Saves hosts whose revision moved, once it has been quiet for the debounce window.
/// 狀態變更並靜止超過延遲時間後，將其寫回儲存。
#[derive(Debug)]
pub struct WriteThrough {
    debounce: Duration,
    tracked: HashMap<StorageKey, Tracked>,
}

impl WriteThrough {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            tracked: HashMap::new(),
        }
    }

    pub fn from_preferences(preferences: &StoragePreferences) -> Self {
        Self::new(Duration::from_millis(preferences.autosave_debounce_ms))
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Whether `host` has changes that were not written yet.
    pub fn is_dirty<R: Reducer>(&self, host: &StoreHost<R>) -> bool {
        let saved = self.tracked.get(&R::KEY).map_or(0, |tracked| tracked.saved);
        host.revision() != saved
    }

    /// Called once per frame for each host. Returns `Ok(true)` when a save happened.
    /// A failed save is retried after another debounce window.
    pub fn tick<R: Reducer>(
        &mut self,
        host: &StoreHost<R>,
        store: &dyn KeyValueStore,
        now: Instant,
    ) -> Result<bool, StorageError> {
        let revision = host.revision();
        let tracked = self.tracked.entry(R::KEY).or_insert(Tracked {
            saved: 0,
            seen: 0,
            changed_at: now,
        });
        if revision == tracked.saved {
            return Ok(false);
        }
        if revision != tracked.seen {
            tracked.seen = revision;
            tracked.changed_at = now;
        }
        if now.saturating_duration_since(tracked.changed_at) < self.debounce {
            return Ok(false);
        }
        match host.save(store) {
            Ok(()) => {
                tracked.saved = revision;
                info!(key = R::KEY.as_str(), revision, "saved store");
                Ok(true)
            }
            Err(error) => {
                tracked.changed_at = now;
                warn!(key = R::KEY.as_str(), %error, "saving store failed");
                Err(error)
            }
        }
    }

    /// Saves immediately if dirty, ignoring the debounce window. Used on shutdown.
    pub fn flush<R: Reducer>(
        &mut self,
        host: &StoreHost<R>,
        store: &dyn KeyValueStore,
    ) -> Result<bool, StorageError> {
        if !self.is_dirty(host) {
            return Ok(false);
        }
        host.save(store)?;
        let revision = host.revision();
        self.tracked.insert(
            R::KEY,
            Tracked {
                saved: revision,
                seen: revision,
                changed_at: Instant::now(),
            },
        );
        info!(key = R::KEY.as_str(), revision, "flushed store");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use minidesk_storage::{KeyValueStoreExt, MemoryStore};

    use super::*;
    use crate::todo::{TodoAction, TodoState};

    fn add(host: &mut StoreHost<TodoState>, title: &str) {
        host.dispatch(TodoAction::Add {
            title: title.into(),
            due: None,
            priority: 3,
        });
    }

    #[test]
    fn saves_after_quiet_period() {
        let store = MemoryStore::new();
        let mut host = StoreHost::<TodoState>::default();
        let mut writer = WriteThrough::new(Duration::from_millis(500));
        let start = Instant::now();

        assert!(!writer.tick(&host, &store, start).unwrap());
        add(&mut host, "a");
        assert!(!writer.tick(&host, &store, start).unwrap());
        add(&mut host, "b");
        let later = start + Duration::from_millis(400);
        assert!(!writer.tick(&host, &store, later).unwrap());
        assert!(store.is_empty());

        let quiet = later + Duration::from_millis(500);
        assert!(writer.tick(&host, &store, quiet).unwrap());
        assert!(!writer.is_dirty(&host));
        let saved: TodoState = store.get_sync(&TodoState::KEY).unwrap();
        assert_eq!(saved.items.len(), 2);
        assert!(!writer.tick(&host, &store, quiet).unwrap());
    }

    #[test]
    fn flush_ignores_debounce() {
        let store = MemoryStore::new();
        let mut host = StoreHost::<TodoState>::default();
        let mut writer = WriteThrough::new(Duration::from_secs(60));
        assert!(!writer.flush(&host, &store).unwrap());
        add(&mut host, "a");
        assert!(writer.flush(&host, &store).unwrap());
        assert_eq!(store.len(), 1);
    }
}
