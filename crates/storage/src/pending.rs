use crossbeam_channel::{Receiver, TryRecvError};

use crate::adapter::StorageKey;

/// Outcome of a non-blocking check on a [`PendingLoad`].
#[derive(Debug, PartialEq)]
pub enum LoadPoll<T> {
    /// The background read has not finished yet.
    Pending,
    /// The read finished; `None` means nothing usable was stored.
    Ready(Option<T>),
    /// The reader went away without answering, or the value was already taken.
    Disconnected,
}

/// One-shot handle for a value being read on a background thread.
/// 背景讀取中的一次性結果。
#[derive(Debug)]
pub struct PendingLoad<T> {
    key: StorageKey,
    rx: Receiver<Option<T>>,
}

impl<T> PendingLoad<T> {
    pub(crate) fn new(key: StorageKey, rx: Receiver<Option<T>>) -> Self {
        Self { key, rx }
    }

    /// Wraps an already available value, for backends that answer synchronously.
    pub fn ready(key: StorageKey, value: Option<T>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(value);
        Self { key, rx }
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    /// Checks for the result without blocking.
    pub fn poll(&self) -> LoadPoll<T> {
        match self.rx.try_recv() {
            Ok(value) => LoadPoll::Ready(value),
            Err(TryRecvError::Empty) => LoadPoll::Pending,
            Err(TryRecvError::Disconnected) => LoadPoll::Disconnected,
        }
    }

    /// Blocks until the read completes.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok().flatten()
    }
}
