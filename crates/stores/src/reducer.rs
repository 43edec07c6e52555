use std::fmt;

use minidesk_filetree::{FileTreeError, TreeDiff};
use minidesk_storage::StorageKey;
use minidesk_table::{TableCommand, TableError, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Refusals reported by a reducer. The state is never changed when one is returned.
/// 歸約器拒絕動作時回報的錯誤；此時狀態保持不變。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Tree(#[from] FileTreeError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Invalid(String),
}

/// What a single action did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Unchanged,
    Changed,
    /// The notes tree changed; carries the touched paths for view bookkeeping.
    TreeChanged(TreeDiff),
    /// Persisted state replaced the defaults.
    Hydrated,
    Refused(StoreError),
}

impl StoreEvent {
    /// Whether the action produced state that has not been persisted yet.
    pub fn is_change(&self) -> bool {
        matches!(self, StoreEvent::Changed | StoreEvent::TreeChanged(_))
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            StoreEvent::Refused(error) => Some(error),
            _ => None,
        }
    }
}

/// Pure `(state, action) -> state` container for one feature. The persisted form is the
/// state itself, stored under [`Reducer::KEY`].
/// 單一功能的純歸約器；持久化的內容即為狀態本身。
pub trait Reducer: Clone + Default + Serialize + DeserializeOwned + Send + 'static {
    type Action: fmt::Debug;

    const KEY: StorageKey;

    fn reduce(&self, action: Self::Action) -> (Self, StoreEvent);

    /// Set once persisted data has replaced the defaults. Never persisted.
    fn is_loaded(&self) -> bool;

    fn mark_loaded(&mut self);

    /// Wraps a persisted snapshot in this feature's hydrate action.
    fn hydrate_action(persisted: Self) -> Self::Action;
}

/// Shared hydrate step: a loaded store ignores further snapshots.
pub(crate) fn hydrate<S: Reducer>(current: &S, persisted: S) -> (S, StoreEvent) {
    if current.is_loaded() {
        debug!(key = S::KEY.as_str(), "already hydrated; ignoring snapshot");
        return (current.clone(), StoreEvent::Unchanged);
    }
    let mut next = persisted;
    next.mark_loaded();
    (next, StoreEvent::Hydrated)
}

pub(crate) fn refuse<S: Clone>(state: &S, error: impl Into<StoreError>) -> (S, StoreEvent) {
    (state.clone(), StoreEvent::Refused(error.into()))
}

/// Maps the command returned by a table handler onto a feature action.
/// 將表格處理器回傳的指令轉為功能動作。
pub fn command_action<R, A>(
    command: TableCommand<R>,
    update: impl FnOnce(R) -> A,
    remove: impl FnOnce(String) -> A,
) -> Option<A> {
    match command {
        TableCommand::None => None,
        TableCommand::Commit(row) => Some(update(row)),
        TableCommand::Remove(id) => Some(remove(id)),
    }
}
