use minidesk_storage::{
    get_async, KeyValueStore, KeyValueStoreExt, LoadPoll, PendingLoad, SharedStore, StorageError,
};
use tracing::{debug, info, warn};

use crate::reducer::{Reducer, StoreEvent};

enum Hydration<R> {
    Idle,
    Pending(PendingLoad<R>),
    Finished,
}

/// Owns one feature's state, counts effective changes and drives its one-shot hydration.
/// 持有單一功能狀態的容器，負責計算變更次數與一次性的載入流程。
pub struct StoreHost<R: Reducer> {
    state: R,
    revision: u64,
    hydration: Hydration<R>,
}

impl<R: Reducer> Default for StoreHost<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R: Reducer> StoreHost<R> {
    pub fn new(state: R) -> Self {
        Self {
            state,
            revision: 0,
            hydration: Hydration::Idle,
        }
    }

    pub fn state(&self) -> &R {
        &self.state
    }

    /// Number of effective changes since the host was created. Hydration does not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_hydrating(&self) -> bool {
        matches!(self.hydration, Hydration::Pending(_))
    }

    pub fn dispatch(&mut self, action: R::Action) -> StoreEvent {
        let (next, event) = self.state.reduce(action);
        match &event {
            StoreEvent::Refused(error) => debug!(key = R::KEY.as_str(), %error, "action refused"),
            event if event.is_change() => self.revision += 1,
            _ => {}
        }
        self.state = next;
        event
    }

    /// Starts the background read of the persisted state. Returns false when the store is
    /// already loaded or a read was issued before.
    pub fn begin_hydration(&mut self, store: &SharedStore) -> bool {
        if self.state.is_loaded() || !matches!(self.hydration, Hydration::Idle) {
            return false;
        }
        info!(key = R::KEY.as_str(), "hydrating store");
        self.hydration = Hydration::Pending(get_async(store, &R::KEY));
        true
    }

    /// Applies the hydration result once it arrives. Call once per frame; returns the
    /// event of the hydrate action when one was dispatched.
    pub fn poll_hydration(&mut self) -> Option<StoreEvent> {
        let Hydration::Pending(pending) = &self.hydration else {
            return None;
        };
        match pending.poll() {
            LoadPoll::Pending => None,
            LoadPoll::Ready(persisted) => {
                self.hydration = Hydration::Finished;
                self.hydrate_from(persisted)
            }
            LoadPoll::Disconnected => {
                warn!(key = R::KEY.as_str(), "hydration reader went away; keeping defaults");
                self.hydration = Hydration::Finished;
                None
            }
        }
    }

    /// Synchronous hydration for callers without a frame loop.
    pub fn hydrate_from(&mut self, persisted: Option<R>) -> Option<StoreEvent> {
        self.hydration = Hydration::Finished;
        match persisted {
            Some(state) => Some(self.dispatch(R::hydrate_action(state))),
            None => {
                info!(key = R::KEY.as_str(), "nothing stored; using defaults");
                None
            }
        }
    }

    /// Writes the current state under the feature's key.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        store.put(&R::KEY, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use minidesk_storage::MemoryStore;

    use super::*;
    use crate::todo::{TodoAction, TodoItem, TodoState};

    fn add(title: &str) -> TodoAction {
        TodoAction::Add {
            title: title.into(),
            due: None,
            priority: 3,
        }
    }

    #[test]
    fn revision_counts_effective_changes_only() {
        let mut host = StoreHost::<TodoState>::default();
        host.dispatch(add("one"));
        host.dispatch(add(""));
        host.dispatch(TodoAction::Remove("missing".into()));
        assert_eq!(host.revision(), 1);
    }

    #[test]
    fn second_hydration_is_a_no_op() {
        let mut persisted = TodoState::default();
        persisted.items.push(TodoItem::new("stored"));
        let memory = MemoryStore::new();
        memory.put(&TodoState::KEY, &persisted).unwrap();
        let store: SharedStore = Arc::new(memory);

        let mut host = StoreHost::<TodoState>::default();
        assert!(host.begin_hydration(&store));
        assert!(!host.begin_hydration(&store));
        let event = loop {
            if let Some(event) = host.poll_hydration() {
                break event;
            }
            std::thread::yield_now();
        };
        assert_eq!(event, StoreEvent::Hydrated);
        assert!(host.state().is_loaded());
        assert_eq!(host.state().items.len(), 1);
        assert_eq!(host.revision(), 0);

        assert!(!host.begin_hydration(&store));
        assert_eq!(
            host.dispatch(TodoAction::Hydrate(TodoState::default())),
            StoreEvent::Unchanged
        );
        assert_eq!(host.state().items.len(), 1);
    }
}
