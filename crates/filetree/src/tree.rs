use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::path::{
    canonical, is_within, join, last_segment, normalize_file_name, parent_of, segments,
};

const ROOT_KEY: &str = "";

/// Variant tag of a node.
/// 節點類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Folder,
}

/// Kind-specific payload. A file never has children and a folder never has content.
/// 依類型區分的內容：檔案沒有子節點，資料夾沒有文字內容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeBody {
    File {
        #[serde(default)]
        content: String,
    },
    Folder {
        /// Full paths of the children in creation order.
        #[serde(default)]
        children: Vec<String>,
    },
}

/// One entry of the document tree.
/// 文件樹中的單一節點。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Segment name, unique among siblings.
    pub path: String,
    /// `/`-joined path from the root; the node's identity and arena key.
    pub full_path: String,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl Node {
    fn file(full_path: String, content: String) -> Self {
        Self {
            path: last_segment(&full_path).to_string(),
            full_path,
            body: NodeBody::File { content },
        }
    }

    fn folder(full_path: String) -> Self {
        Self {
            path: last_segment(&full_path).to_string(),
            full_path,
            body: NodeBody::Folder {
                children: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::File { .. } => NodeKind::File,
            NodeBody::Folder { .. } => NodeKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind() == NodeKind::File
    }

    /// Markdown source of a file node.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File { content } => Some(content),
            NodeBody::Folder { .. } => None,
        }
    }

    /// Child full paths of a folder node; empty for files.
    pub fn child_paths(&self) -> &[String] {
        match &self.body {
            NodeBody::Folder { children } => children,
            NodeBody::File { .. } => &[],
        }
    }

    /// Distance from the root (top-level entries have depth 0). Derived, never stored.
    pub fn depth(&self) -> usize {
        self.full_path.matches('/').count()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.body {
            NodeBody::Folder { children } => Some(children),
            NodeBody::File { .. } => None,
        }
    }
}

/// Captures which full paths a mutation touched.
/// 紀錄變動後受影響的完整路徑。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `(old, new)` pairs for the renamed node and every descendant.
    pub renamed: Vec<(String, String)>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.renamed.is_empty()
    }

    /// Maps a path that existed before the mutation to its current location.
    pub fn remap(&self, path: &str) -> Option<String> {
        if self.removed.iter().any(|removed| removed == path) {
            return None;
        }
        let renamed = self
            .renamed
            .iter()
            .find(|(old, _)| old == path)
            .map(|(_, new)| new.clone());
        Some(renamed.unwrap_or_else(|| path.to_string()))
    }
}

/// Tree-manipulation errors.
/// 文件樹操作錯誤類型。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileTreeError {
    #[error("\"{0}\" already exists")]
    AlreadyExists(String),
    #[error("invalid path {0:?}")]
    InvalidPath(String),
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("\"{0}\" is a file and cannot contain other entries")]
    NotAFolder(String),
    #[error("inconsistent tree snapshot: {0}")]
    Inconsistent(String),
}

/// Immutable document tree keyed by full path, plus the current file selection.
/// Every operation returns a new value and leaves `self` untouched.
/// 以完整路徑為鍵的不可變文件樹，並記錄目前選取的檔案。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TreeSnapshot", into = "TreeSnapshot")]
pub struct FileTree {
    revision: u64,
    nodes: BTreeMap<String, Node>,
    selected: Option<String>,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl FileTree {
    /// Constructs a tree holding only the virtual root folder.
    /// 建立僅含虛擬根資料夾的空樹。
    pub fn empty() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_KEY.to_string(), Node::folder(ROOT_KEY.to_string()));
        Self {
            revision: 0,
            nodes,
            selected: None,
        }
    }

    /// Incremented by every mutation that changed something.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, full_path: &str) -> Option<&Node> {
        let key = canonical(full_path)?;
        if key.is_empty() {
            return None;
        }
        self.nodes.get(&key)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_KEY]
    }

    /// Children of the folder at `full_path` (`""` for the top level), in creation order.
    pub fn children<'a>(&'a self, full_path: &str) -> impl Iterator<Item = &'a Node> + 'a {
        let folder = canonical(full_path).and_then(|key| self.nodes.get(&key));
        folder
            .map(Node::child_paths)
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.nodes.get(child))
    }

    /// All file nodes in full-path order.
    pub fn files(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_file())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_ref().and_then(|path| self.nodes.get(path))
    }

    /// Creates a file, implicitly creating missing parent folders. A missing `.md`
    /// extension is appended before the existence check.
    /// 建立檔案並自動補齊上層資料夾；副檔名缺少 `.md` 時先補上再檢查是否重複。
    pub fn create(
        &self,
        path: &str,
        content: impl Into<String>,
    ) -> Result<(Self, TreeDiff), FileTreeError> {
        let parts = segments(path)?;
        let Some((file_name, folders)) = parts.split_last() else {
            return Err(FileTreeError::InvalidPath(path.to_string()));
        };
        let target = join(&folders.join("/"), &normalize_file_name(file_name));
        if self.nodes.contains_key(&target) {
            return Err(FileTreeError::AlreadyExists(target));
        }

        let mut next = self.clone();
        let mut diff = TreeDiff::default();
        let parent = next.ensure_folders(folders, &mut diff)?;
        next.attach(&parent, Node::file(target.clone(), content.into()));
        diff.added.push(target);
        next.revision = self.revision.wrapping_add(1);
        debug!(added = ?diff.added, "created file");
        Ok((next, diff))
    }

    /// Creates a folder (and any missing ancestors).
    /// 建立資料夾及缺少的上層資料夾。
    pub fn create_folder(&self, path: &str) -> Result<(Self, TreeDiff), FileTreeError> {
        let parts = segments(path)?;
        if parts.is_empty() {
            return Err(FileTreeError::InvalidPath(path.to_string()));
        }
        let target = parts.join("/");
        if self.nodes.contains_key(&target) {
            return Err(FileTreeError::AlreadyExists(target));
        }

        let mut next = self.clone();
        let mut diff = TreeDiff::default();
        next.ensure_folders(&parts, &mut diff)?;
        next.revision = self.revision.wrapping_add(1);
        debug!(added = ?diff.added, "created folder");
        Ok((next, diff))
    }

    /// Renames the node at `target` and recomputes the full path of every descendant.
    /// A missing target is a no-op; a name already used by a sibling is refused.
    /// 重新命名節點並重算所有子孫的完整路徑；目標不存在時不做任何事。
    pub fn rename(&self, target: &str, new_name: &str) -> Result<(Self, TreeDiff), FileTreeError> {
        let Some(node) = self.get(target) else {
            return Ok((self.clone(), TreeDiff::default()));
        };
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains('/') || matches!(new_name, "." | "..") {
            return Err(FileTreeError::InvalidName(new_name.to_string()));
        }
        let new_name = if node.is_file() {
            normalize_file_name(new_name)
        } else {
            new_name.to_string()
        };

        let old_path = node.full_path.clone();
        let new_path = join(parent_of(&old_path), &new_name);
        if new_path == old_path {
            return Ok((self.clone(), TreeDiff::default()));
        }
        if self.nodes.contains_key(&new_path) {
            return Err(FileTreeError::AlreadyExists(new_path));
        }

        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| is_within(key, &old_path))
            .cloned()
            .collect();

        let mut next = self.clone();
        let mut diff = TreeDiff::default();
        let relocate = |path: &str| format!("{new_path}{}", &path[old_path.len()..]);
        for old_key in moved {
            let Some(mut node) = next.nodes.remove(&old_key) else {
                continue;
            };
            let new_key = relocate(&old_key);
            node.full_path = new_key.clone();
            node.path = last_segment(&new_key).to_string();
            if let Some(children) = node.children_mut() {
                for child in children.iter_mut() {
                    *child = relocate(child.as_str());
                }
            }
            next.nodes.insert(new_key.clone(), node);
            diff.renamed.push((old_key, new_key));
        }

        if let Some(siblings) = next
            .nodes
            .get_mut(parent_of(&old_path))
            .and_then(Node::children_mut)
        {
            if let Some(slot) = siblings.iter_mut().find(|child| **child == old_path) {
                *slot = new_path.clone();
            }
        }
        if let Some(selected) = next.selected.as_mut() {
            if is_within(selected.as_str(), &old_path) {
                *selected = relocate(selected.as_str());
            }
        }

        next.revision = self.revision.wrapping_add(1);
        debug!(from = %old_path, to = %new_path, moved = diff.renamed.len(), "renamed node");
        Ok((next, diff))
    }

    /// Removes a node and, for folders, its entire subtree. Clears the selection when it
    /// pointed into the removed part. A missing target leaves the tree unchanged.
    /// 刪除節點（資料夾連同整個子樹）；若選取的檔案被移除則清除選取。
    pub fn delete(&self, target: &str) -> (Self, TreeDiff) {
        let Some(node) = self.get(target) else {
            return (self.clone(), TreeDiff::default());
        };
        let doomed = node.full_path.clone();

        let mut next = self.clone();
        let mut diff = TreeDiff::default();
        next.nodes.retain(|key, _| {
            let remove = is_within(key, &doomed);
            if remove {
                diff.removed.push(key.clone());
            }
            !remove
        });
        if let Some(siblings) = next
            .nodes
            .get_mut(parent_of(&doomed))
            .and_then(Node::children_mut)
        {
            siblings.retain(|child| *child != doomed);
        }
        if next
            .selected
            .as_deref()
            .is_some_and(|selected| is_within(selected, &doomed))
        {
            next.selected = None;
        }

        next.revision = self.revision.wrapping_add(1);
        debug!(removed = diff.removed.len(), path = %doomed, "deleted node");
        (next, diff)
    }

    /// Selects the file at `path`. Folders and unknown paths leave the selection unchanged.
    /// 選取指定檔案；資料夾或不存在的路徑不影響目前選取。
    pub fn select(&self, path: &str) -> Self {
        match self.get(path) {
            Some(node) if node.is_file() && self.selected() != Some(node.full_path.as_str()) => {
                let mut next = self.clone();
                next.selected = Some(node.full_path.clone());
                next.revision = self.revision.wrapping_add(1);
                next
            }
            _ => self.clone(),
        }
    }

    pub fn clear_selection(&self) -> Self {
        if self.selected.is_none() {
            return self.clone();
        }
        let mut next = self.clone();
        next.selected = None;
        next.revision = self.revision.wrapping_add(1);
        next
    }

    /// Replaces the markdown source of a file. Folders and unknown paths are ignored.
    /// 更新檔案內容；資料夾或不存在的路徑將被忽略。
    pub fn update_content(&self, path: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        let Some(key) = self
            .get(path)
            .filter(|node| node.content().is_some_and(|current| current != content))
            .map(|node| node.full_path.clone())
        else {
            return self.clone();
        };
        let mut next = self.clone();
        if let Some(node) = next.nodes.get_mut(&key) {
            node.body = NodeBody::File { content };
        }
        next.revision = self.revision.wrapping_add(1);
        next
    }

    /// Walks `folders` from the root, creating missing ones. Returns the deepest folder.
    fn ensure_folders(
        &mut self,
        folders: &[&str],
        diff: &mut TreeDiff,
    ) -> Result<String, FileTreeError> {
        let mut parent = ROOT_KEY.to_string();
        for name in folders {
            let full = join(&parent, name);
            match self.nodes.get(&full) {
                Some(node) if node.is_folder() => {}
                Some(_) => return Err(FileTreeError::NotAFolder(full)),
                None => {
                    self.attach(&parent, Node::folder(full.clone()));
                    diff.added.push(full.clone());
                }
            }
            parent = full;
        }
        Ok(parent)
    }

    fn attach(&mut self, parent: &str, node: Node) {
        if let Some(children) = self.nodes.get_mut(parent).and_then(Node::children_mut) {
            children.push(node.full_path.clone());
        }
        self.nodes.insert(node.full_path.clone(), node);
    }
}

/// Serialized form of [`FileTree`]; validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeSnapshot {
    #[serde(default)]
    revision: u64,
    nodes: BTreeMap<String, Node>,
    #[serde(default)]
    selected: Option<String>,
}

impl From<FileTree> for TreeSnapshot {
    fn from(tree: FileTree) -> Self {
        Self {
            revision: tree.revision,
            nodes: tree.nodes,
            selected: tree.selected,
        }
    }
}

impl TryFrom<TreeSnapshot> for FileTree {
    type Error = FileTreeError;

    fn try_from(snapshot: TreeSnapshot) -> Result<Self, Self::Error> {
        let inconsistent =
            |msg: String| -> Result<Self, FileTreeError> { Err(FileTreeError::Inconsistent(msg)) };
        let nodes = snapshot.nodes;
        match nodes.get(ROOT_KEY) {
            Some(root) if root.is_folder() => {}
            _ => return inconsistent("missing root folder".into()),
        }

        let mut listed = BTreeSet::new();
        for (key, node) in &nodes {
            if *key != node.full_path {
                return inconsistent(format!("key {key:?} holds node {:?}", node.full_path));
            }
            if !key.is_empty() && node.path != last_segment(key) {
                return inconsistent(format!("node {key:?} is named {:?}", node.path));
            }
            for child in node.child_paths() {
                if parent_of(child) != key.as_str() || !nodes.contains_key(child) {
                    return inconsistent(format!("folder {key:?} lists stray child {child:?}"));
                }
                if !listed.insert(child.as_str()) {
                    return inconsistent(format!("child {child:?} is listed twice"));
                }
            }
        }
        if listed.len() != nodes.len() - 1 {
            return inconsistent("some nodes are not reachable from the root".into());
        }

        let selected = snapshot
            .selected
            .filter(|path| nodes.get(path).is_some_and(Node::is_file));
        Ok(Self {
            revision: snapshot.revision,
            nodes,
            selected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(paths: &[&str]) -> FileTree {
        paths.iter().fold(FileTree::empty(), |tree, path| {
            tree.create(path, "").expect("create").0
        })
    }

    fn child_names(tree: &FileTree, folder: &str) -> Vec<String> {
        tree.children(folder).map(|node| node.path.clone()).collect()
    }

    #[test]
    fn create_appends_markdown_extension() {
        let (tree, diff) = FileTree::empty().create("notes", "").unwrap();
        assert!(tree.get("notes").is_none());
        let node = tree.get("notes.md").expect("normalized file");
        assert!(node.is_file());
        assert_eq!(diff.added, vec!["notes.md".to_string()]);
    }

    #[test]
    fn create_builds_parent_chain_in_order() {
        let (tree, diff) = FileTree::empty().create("a/b/c", "body").unwrap();
        assert_eq!(diff.added, vec!["a", "a/b", "a/b/c.md"]);
        assert!(tree.get("a").unwrap().is_folder());
        assert!(tree.get("a/b").unwrap().is_folder());
        assert_eq!(tree.get("a/b/c.md").unwrap().content(), Some("body"));
        assert_eq!(tree.get("a/b/c.md").unwrap().depth(), 2);
        assert_eq!(tree.revision(), 1);
    }

    #[test]
    fn create_duplicate_is_refused_without_mutation() {
        let tree = tree_with(&["todo/groceries"]);
        let err = tree.create("todo/groceries.md", "other").unwrap_err();
        assert_eq!(err, FileTreeError::AlreadyExists("todo/groceries.md".into()));
        assert_eq!(tree.get("todo/groceries.md").unwrap().content(), Some(""));
    }

    #[test]
    fn create_reuses_existing_folders() {
        let tree = tree_with(&["todo/a", "todo/b"]);
        assert_eq!(child_names(&tree, ""), vec!["todo"]);
        assert_eq!(child_names(&tree, "todo"), vec!["a.md", "b.md"]);
    }

    #[test]
    fn create_through_a_file_is_refused() {
        let tree = tree_with(&["readme"]);
        let err = tree.create("readme.md/inner", "").unwrap_err();
        assert_eq!(err, FileTreeError::NotAFolder("readme.md".into()));
    }

    #[test]
    fn create_rejects_empty_and_dot_paths() {
        let tree = FileTree::empty();
        assert!(matches!(tree.create("", ""), Err(FileTreeError::InvalidPath(_))));
        assert!(matches!(tree.create("//", ""), Err(FileTreeError::InvalidPath(_))));
        assert!(matches!(tree.create("a/../b", ""), Err(FileTreeError::InvalidPath(_))));
    }

    #[test]
    fn create_folder_then_file_inside() {
        let (tree, _) = FileTree::empty().create_folder("journal/2024").unwrap();
        assert!(tree.get("journal/2024").unwrap().is_folder());
        let err = tree.create_folder("journal").unwrap_err();
        assert_eq!(err, FileTreeError::AlreadyExists("journal".into()));
        let (tree, diff) = tree.create("journal/2024/jan", "").unwrap();
        assert_eq!(diff.added, vec!["journal/2024/jan.md"]);
    }

    #[test]
    fn rename_file_keeps_position_and_extension() {
        let tree = tree_with(&["a", "b", "c"]);
        let (tree, diff) = tree.rename("b.md", "middle").unwrap();
        assert_eq!(diff.renamed, vec![("b.md".into(), "middle.md".into())]);
        assert_eq!(child_names(&tree, ""), vec!["a.md", "middle.md", "c.md"]);
    }

    #[test]
    fn rename_to_sibling_name_is_refused() {
        let tree = tree_with(&["a", "b"]);
        let err = tree.rename("a.md", "b").unwrap_err();
        assert_eq!(err, FileTreeError::AlreadyExists("b.md".into()));
        assert!(matches!(
            tree.rename("a.md", "x/y"),
            Err(FileTreeError::InvalidName(_))
        ));
        assert!(matches!(tree.rename("a.md", "  "), Err(FileTreeError::InvalidName(_))));
    }

    #[test]
    fn rename_missing_target_is_noop() {
        let tree = tree_with(&["a"]);
        let (next, diff) = tree.rename("ghost.md", "x").unwrap();
        assert_eq!(next, tree);
        assert!(diff.is_empty());
    }

    #[test]
    fn rename_folder_leaves_similarly_prefixed_siblings_alone() {
        let tree = tree_with(&["todo/a", "todo-list/b"]);
        let (tree, _) = tree.rename("todo", "tasks").unwrap();
        assert!(tree.get("tasks/a.md").is_some());
        assert!(tree.get("todo-list/b.md").is_some());
        assert!(tree.get("todo").is_none());
    }

    #[test]
    fn delete_folder_removes_subtree_and_selection() {
        let tree = tree_with(&["docs/guide/intro", "docs/faq", "top"]);
        let tree = tree.select("docs/guide/intro.md");
        let (tree, diff) = tree.delete("docs");
        assert_eq!(diff.removed.len(), 4);
        assert!(tree.get("docs/faq.md").is_none());
        assert_eq!(tree.selected(), None);
        assert_eq!(child_names(&tree, ""), vec!["top.md"]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn delete_other_node_keeps_selection() {
        let tree = tree_with(&["a", "b"]).select("a.md");
        let (tree, _) = tree.delete("b.md");
        assert_eq!(tree.selected(), Some("a.md"));
    }

    #[test]
    fn select_ignores_folders_and_unknown_paths() {
        let tree = tree_with(&["dir/file"]).select("dir/file.md");
        assert_eq!(tree.select("dir").selected(), Some("dir/file.md"));
        assert_eq!(tree.select("nope.md").selected(), Some("dir/file.md"));
    }

    #[test]
    fn update_content_only_touches_files() {
        let tree = tree_with(&["dir/file"]);
        let updated = tree.update_content("dir/file.md", "# Title");
        assert_eq!(updated.get("dir/file.md").unwrap().content(), Some("# Title"));
        assert_eq!(updated.revision(), tree.revision() + 1);
        assert_eq!(tree.update_content("dir", "x"), tree);
        assert_eq!(updated.update_content("dir/file.md", "# Title"), updated);
    }

    #[test]
    fn snapshot_round_trip_preserves_order_and_selection() {
        let tree = tree_with(&["z", "a", "m/inner"]).select("m/inner.md");
        let json = serde_json::to_string(&tree).unwrap();
        let restored: FileTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
        assert_eq!(child_names(&restored, ""), vec!["z.md", "a.md", "m"]);
    }

    #[test]
    fn inconsistent_snapshot_is_rejected() {
        let json = r#"{
            "revision": 3,
            "nodes": {
                "": { "path": "", "full_path": "", "type": "folder", "children": ["x.md"] }
            }
        }"#;
        assert!(serde_json::from_str::<FileTree>(json).is_err());
    }

    #[test]
    fn stale_selection_is_dropped_on_load() {
        let json = r#"{
            "nodes": {
                "": { "path": "", "full_path": "", "type": "folder", "children": [] }
            },
            "selected": "gone.md"
        }"#;
        let tree: FileTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.selected(), None);
    }
}
