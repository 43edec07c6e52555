use minidesk_filetree::{FileTree, FileTreeError, TreeDiff, TreeOutcome};
use minidesk_storage::{keys, StorageKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reducer::{hydrate, refuse, Reducer, StoreEvent};

/// Markdown documents of the notes page.
/// 筆記頁面的 Markdown 文件樹。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesState {
    #[serde(default)]
    pub tree: FileTree,
    #[serde(skip)]
    loaded: bool,
}

impl NotesState {
    pub fn with_tree(tree: FileTree) -> Self {
        Self {
            tree,
            loaded: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NotesAction {
    Create { path: String, content: String },
    CreateFolder(String),
    Rename { target: String, new_name: String },
    Delete(String),
    Select(String),
    ClearSelection,
    UpdateContent { path: String, content: String },
    Hydrate(NotesState),
}

impl NotesAction {
    /// Action requested by the tree panel, if any.
    pub fn from_outcome(outcome: TreeOutcome) -> Option<Self> {
        match outcome {
            TreeOutcome::None => None,
            TreeOutcome::Select(path) => Some(NotesAction::Select(path)),
            TreeOutcome::ClearSelection => Some(NotesAction::ClearSelection),
            TreeOutcome::CreateFile(path) => Some(NotesAction::Create {
                path,
                content: String::new(),
            }),
            TreeOutcome::CreateFolder(path) => Some(NotesAction::CreateFolder(path)),
            TreeOutcome::Rename { target, new_name } => {
                Some(NotesAction::Rename { target, new_name })
            }
        }
    }
}

impl NotesState {
    fn apply_tree(
        &self,
        result: Result<(FileTree, TreeDiff), FileTreeError>,
    ) -> (Self, StoreEvent) {
        match result {
            Ok((_, diff)) if diff.is_empty() => (self.clone(), StoreEvent::Unchanged),
            Ok((tree, diff)) => (self.replace_tree(tree), StoreEvent::TreeChanged(diff)),
            Err(error) => {
                debug!(%error, "notes action refused");
                refuse(self, error)
            }
        }
    }

    fn apply_plain(&self, tree: FileTree) -> (Self, StoreEvent) {
        if tree.revision() == self.tree.revision() {
            (self.clone(), StoreEvent::Unchanged)
        } else {
            (self.replace_tree(tree), StoreEvent::Changed)
        }
    }

    fn replace_tree(&self, tree: FileTree) -> Self {
        Self {
            tree,
            loaded: self.loaded,
        }
    }
}

impl Reducer for NotesState {
    type Action = NotesAction;

    const KEY: StorageKey = keys::NOTES;

    fn reduce(&self, action: NotesAction) -> (Self, StoreEvent) {
        debug!(?action, "notes action");
        match action {
            NotesAction::Create { path, content } => {
                self.apply_tree(self.tree.create(&path, content))
            }
            NotesAction::CreateFolder(path) => self.apply_tree(self.tree.create_folder(&path)),
            NotesAction::Rename { target, new_name } => {
                self.apply_tree(self.tree.rename(&target, &new_name))
            }
            NotesAction::Delete(path) => self.apply_tree(Ok(self.tree.delete(&path))),
            NotesAction::Select(path) => self.apply_plain(self.tree.select(&path)),
            NotesAction::ClearSelection => self.apply_plain(self.tree.clear_selection()),
            NotesAction::UpdateContent { path, content } => {
                self.apply_plain(self.tree.update_content(&path, content))
            }
            NotesAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> NotesAction {
        NotesAction::Hydrate(persisted)
    }
}
