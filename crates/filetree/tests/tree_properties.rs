use minidesk_filetree::{flatten, ExpandedSet, FileTree, NodeKind};

fn build(paths: &[&str]) -> FileTree {
    paths
        .iter()
        .fold(FileTree::empty(), |tree, path| tree.create(path, "").unwrap().0)
}

fn all_paths(tree: &FileTree) -> Vec<String> {
    let expanded = tree
        .files()
        .fold(ExpandedSet::new(), |set, node| set.reveal(&node.full_path));
    flatten(tree, &expanded)
        .into_iter()
        .map(|row| row.full_path)
        .collect()
}

#[test]
fn deleting_missing_path_leaves_tree_unchanged() {
    let tree = build(&["a/b/c", "a/d", "e"]).select("a/d.md");
    for missing in ["nope.md", "a/b/zz.md", "a/b/c", "", "/"] {
        let (next, diff) = tree.delete(missing);
        assert_eq!(next, tree, "deleting {missing:?} changed the tree");
        assert!(diff.is_empty());
    }
}

#[test]
fn renaming_any_folder_updates_every_descendant() {
    let tree = build(&[
        "projects/alpha/spec",
        "projects/alpha/notes/day1",
        "projects/alpha/notes/day2",
        "projects/beta/todo",
        "inbox/misc",
    ]);
    let folders: Vec<String> = all_paths(&tree)
        .into_iter()
        .filter(|path| tree.get(path).is_some_and(|node| node.kind() == NodeKind::Folder))
        .collect();
    assert_eq!(folders.len(), 5);

    for folder in folders {
        let (renamed, diff) = tree.rename(&folder, "renamed").unwrap();
        let (_, new_root) = diff
            .renamed
            .iter()
            .find(|(old, _)| *old == folder)
            .cloned()
            .expect("renamed folder recorded");
        let prefix = format!("{new_root}/");
        let old_prefix = format!("{folder}/");

        let descendants: Vec<_> = diff
            .renamed
            .iter()
            .filter(|(old, _)| old.starts_with(&old_prefix))
            .collect();
        let expected = all_paths(&tree)
            .iter()
            .filter(|path| path.starts_with(&old_prefix))
            .count();
        assert_eq!(descendants.len(), expected);

        for (_, new_path) in descendants {
            assert!(new_path.starts_with(&prefix), "{new_path} not under {prefix}");
            let node = renamed.get(new_path).expect("descendant moved");
            assert_eq!(&node.full_path, new_path);
        }
        assert!(renamed.get(&folder).is_none());
        assert_eq!(renamed.len(), tree.len());
    }
}

#[test]
fn create_without_extension_produces_markdown_file() {
    let (tree, _) = FileTree::empty().create("notes", "").unwrap();
    assert!(tree.get("notes.md").is_some_and(|node| node.is_file()));
    assert!(tree.get("notes").is_none());
}

#[test]
fn create_select_rename_scenario() {
    let (tree, _) = FileTree::empty().create("todo/groceries", "").unwrap();
    let folder = tree.get("todo").expect("folder created");
    assert!(folder.is_folder());
    assert_eq!(folder.child_paths(), ["todo/groceries.md".to_string()]);

    let tree = tree.select("todo/groceries.md");
    assert_eq!(tree.selected(), Some("todo/groceries.md"));

    let (tree, _) = tree.rename("todo", "tasks").unwrap();
    let file = tree.get("tasks/groceries.md").expect("file moved with folder");
    assert_eq!(file.full_path, "tasks/groceries.md");
    assert_eq!(tree.selected(), Some("tasks/groceries.md"));
    assert!(tree.get("todo/groceries.md").is_none());
}

#[test]
fn siblings_never_share_a_name() {
    let tree = build(&["x/one", "x/two"]);
    assert!(tree.create("x/one", "").is_err());
    assert!(tree.rename("x/two.md", "one").is_err());
    assert!(tree.create_folder("x").is_err());

    let names: Vec<_> = tree.children("x").map(|node| node.path.clone()).collect();
    assert_eq!(names, vec!["one.md", "two.md"]);
}
