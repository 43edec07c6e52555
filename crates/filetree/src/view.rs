use crate::expanded::ExpandedSet;
use crate::path::{join, last_segment, MARKDOWN_EXTENSION};
use crate::tree::{FileTree, Node, NodeKind, TreeDiff};

/// One visible line of the rendered tree.
/// 樹狀檢視中可見的一列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub full_path: String,
    pub name: String,
    pub kind: NodeKind,
    /// Indentation level; top-level entries are at 0.
    pub depth: usize,
    pub expanded: bool,
    pub selected: bool,
    pub has_children: bool,
}

/// Flattens the visible part of `tree` depth-first, in creation order. Children of
/// collapsed folders are skipped.
/// 依建立順序深度優先展開可見節點；收合資料夾的子節點不輸出。
pub fn flatten(tree: &FileTree, expanded: &ExpandedSet) -> Vec<TreeRow> {
    let mut rows = Vec::with_capacity(tree.len());
    for child in tree.children("") {
        push_rows(tree, expanded, child, 0, &mut rows);
    }
    rows
}

fn push_rows(
    tree: &FileTree,
    expanded: &ExpandedSet,
    node: &Node,
    depth: usize,
    rows: &mut Vec<TreeRow>,
) {
    let is_open = node.is_folder() && expanded.contains(&node.full_path);
    rows.push(TreeRow {
        full_path: node.full_path.clone(),
        name: node.path.clone(),
        kind: node.kind(),
        depth,
        expanded: is_open,
        selected: tree.selected() == Some(node.full_path.as_str()),
        has_children: !node.child_paths().is_empty(),
    });
    if is_open {
        for child in tree.children(&node.full_path) {
            push_rows(tree, expanded, child, depth + 1, rows);
        }
    }
}

/// Modal overlay used to collect a name for create and rename.
/// 用於新增與重新命名的輸入對話框狀態。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TreeModal {
    #[default]
    Closed,
    Create {
        /// Folder the new entry goes into; `None` means the top level.
        parent: Option<String>,
        folder: bool,
        input: String,
        error: Option<String>,
    },
    Rename {
        target: String,
        input: String,
        error: Option<String>,
    },
}

impl TreeModal {
    pub fn is_open(&self) -> bool {
        !matches!(self, TreeModal::Closed)
    }

    pub fn input(&self) -> Option<&str> {
        match self {
            TreeModal::Closed => None,
            TreeModal::Create { input, .. } | TreeModal::Rename { input, .. } => Some(input),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TreeModal::Closed => None,
            TreeModal::Create { error, .. } | TreeModal::Rename { error, .. } => error.as_deref(),
        }
    }

    fn set_input(&mut self, value: String) {
        match self {
            TreeModal::Closed => {}
            TreeModal::Create { input, error, .. } | TreeModal::Rename { input, error, .. } => {
                *input = value;
                *error = None;
            }
        }
    }

    fn set_error(&mut self, message: String) {
        match self {
            TreeModal::Closed => {}
            TreeModal::Create { error, .. } | TreeModal::Rename { error, .. } => {
                *error = Some(message);
            }
        }
    }
}

/// User interaction reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    ClickFolder(String),
    ClickFile(String),
    OpenCreate {
        parent: Option<String>,
        folder: bool,
    },
    OpenRename(String),
    /// Collapses a folder together with every folder below it.
    CollapseFolder(String),
    /// Closes the open note without deleting it.
    Deselect,
    Input(String),
    Submit,
    /// Click outside the overlay, or an explicit cancel.
    Dismiss,
}

/// Tree operation the host should run against its store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeOutcome {
    None,
    Select(String),
    ClearSelection,
    CreateFile(String),
    CreateFolder(String),
    Rename { target: String, new_name: String },
}

/// Local state of the tree panel: which folders are open and which overlay is showing.
/// The tree itself is owned by the caller.
/// 樹狀面板的本地狀態：展開的資料夾與目前的對話框。
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    expanded: ExpandedSet,
    modal: TreeModal,
    revealed: Option<String>,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expanded(&self) -> &ExpandedSet {
        &self.expanded
    }

    pub fn modal(&self) -> &TreeModal {
        &self.modal
    }

    pub fn rows(&self, tree: &FileTree) -> Vec<TreeRow> {
        flatten(tree, &self.expanded)
    }

    pub fn handle(&mut self, event: TreeEvent) -> TreeOutcome {
        match event {
            TreeEvent::ClickFolder(path) => {
                self.expanded = self.expanded.toggle(&path);
                TreeOutcome::None
            }
            TreeEvent::ClickFile(path) => TreeOutcome::Select(path),
            TreeEvent::CollapseFolder(path) => {
                self.expanded = self.expanded.collapse_all_within(&path);
                TreeOutcome::None
            }
            TreeEvent::Deselect => TreeOutcome::ClearSelection,
            TreeEvent::OpenCreate { parent, folder } => {
                self.modal = TreeModal::Create {
                    parent,
                    folder,
                    input: String::new(),
                    error: None,
                };
                TreeOutcome::None
            }
            TreeEvent::OpenRename(target) => {
                let name = last_segment(&target);
                let input = name
                    .strip_suffix(MARKDOWN_EXTENSION)
                    .unwrap_or(name)
                    .to_string();
                self.modal = TreeModal::Rename {
                    target,
                    input,
                    error: None,
                };
                TreeOutcome::None
            }
            TreeEvent::Input(value) => {
                self.modal.set_input(value);
                TreeOutcome::None
            }
            TreeEvent::Submit => self.submit(),
            TreeEvent::Dismiss => {
                self.modal = TreeModal::Closed;
                TreeOutcome::None
            }
        }
    }

    fn submit(&mut self) -> TreeOutcome {
        let outcome = match &self.modal {
            TreeModal::Closed => return TreeOutcome::None,
            TreeModal::Create { input, .. } | TreeModal::Rename { input, .. }
                if input.trim().is_empty() =>
            {
                None
            }
            TreeModal::Create {
                parent,
                folder,
                input,
                ..
            } => {
                let path = join(parent.as_deref().unwrap_or(""), input.trim());
                Some(if *folder {
                    TreeOutcome::CreateFolder(path)
                } else {
                    TreeOutcome::CreateFile(path)
                })
            }
            TreeModal::Rename { target, input, .. } => Some(TreeOutcome::Rename {
                target: target.clone(),
                new_name: input.trim().to_string(),
            }),
        };
        match outcome {
            Some(outcome) => outcome,
            None => {
                self.modal.set_error("Name cannot be empty".to_string());
                TreeOutcome::None
            }
        }
    }

    /// Reports the result of the operation produced by [`TreeView::handle`]. Success
    /// closes the overlay and keeps the expand state in step with the tree; failure keeps
    /// the overlay open with the message.
    pub fn complete(&mut self, result: Result<&TreeDiff, String>) {
        match result {
            Ok(diff) => {
                self.modal = TreeModal::Closed;
                let mut expanded = self.expanded.remap(diff);
                for added in &diff.added {
                    expanded = expanded.reveal(added);
                }
                self.expanded = expanded;
            }
            Err(message) => self.modal.set_error(message),
        }
    }

    /// Drops expand entries for folders that no longer exist and reveals the selected
    /// file when the selection moved. Folders the user collapsed around an unchanged
    /// selection stay collapsed.
    pub fn sync(&mut self, tree: &FileTree) {
        let mut expanded = self.expanded.prune(tree);
        let selected = tree.selected();
        if selected != self.revealed.as_deref() {
            if let Some(path) = selected {
                expanded = expanded.reveal(path);
            }
            self.revealed = selected.map(str::to_string);
        }
        self.expanded = expanded;
    }
}
