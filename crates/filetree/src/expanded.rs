use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::path::{is_within, parent_of};
use crate::tree::{FileTree, TreeDiff};

/// Set of folder paths rendered expanded. Independent of the tree itself.
/// 目前展開的資料夾路徑集合，與文件樹本身無關。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedSet(BTreeSet<String>);

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Adds `path` when absent and removes it when present.
    pub fn toggle(&self, path: &str) -> Self {
        let mut next = self.clone();
        if !next.0.remove(path) {
            next.0.insert(path.to_string());
        }
        next
    }

    /// Expands every ancestor folder of `path` so that it becomes visible.
    pub fn reveal(&self, path: &str) -> Self {
        let mut next = self.clone();
        let mut current = parent_of(path);
        while !current.is_empty() {
            next.0.insert(current.to_string());
            current = parent_of(current);
        }
        next
    }

    /// Follows renames and drops removed folders recorded in `diff`.
    pub fn remap(&self, diff: &TreeDiff) -> Self {
        Self(self.0.iter().filter_map(|path| diff.remap(path)).collect())
    }

    /// Keeps only entries that still name a folder of `tree`.
    pub fn prune(&self, tree: &FileTree) -> Self {
        Self(
            self.0
                .iter()
                .filter(|path| tree.get(path).is_some_and(|node| node.is_folder()))
                .cloned()
                .collect(),
        )
    }

    /// Collapses `folder` and everything below it.
    pub fn collapse_all_within(&self, folder: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|path| !is_within(path, folder))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_an_involution() {
        let set = ExpandedSet::new();
        let opened = set.toggle("docs");
        assert!(opened.contains("docs"));
        assert!(!set.contains("docs"));
        assert_eq!(opened.toggle("docs"), set);
    }

    #[test]
    fn reveal_opens_every_ancestor() {
        let set = ExpandedSet::new().reveal("a/b/c/file.md");
        let paths: Vec<_> = set.iter().collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn remap_follows_folder_rename() {
        let tree = FileTree::empty().create("todo/sub/x", "").unwrap().0;
        let set = ExpandedSet::new().toggle("todo").toggle("todo/sub");
        let (_, diff) = tree.rename("todo", "tasks").unwrap();
        let paths: Vec<_> = set.remap(&diff).iter().map(str::to_string).collect();
        assert_eq!(paths, vec!["tasks", "tasks/sub"]);
    }

    #[test]
    fn prune_and_collapse() {
        let tree = FileTree::empty().create("keep/x", "").unwrap().0;
        let set = ExpandedSet::new().toggle("keep").toggle("gone");
        assert_eq!(set.prune(&tree), ExpandedSet::new().toggle("keep"));
        assert!(set.collapse_all_within("keep").iter().eq(["gone"]));
    }
}
