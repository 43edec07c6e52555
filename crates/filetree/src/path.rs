use crate::tree::FileTreeError;

/// Extension appended to file names that lack it.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Splits a user-typed path into trimmed segments, ignoring empty ones
/// (`"/a//b/"` yields `["a", "b"]`).
pub(crate) fn segments(raw: &str) -> Result<Vec<&str>, FileTreeError> {
    let parts: Vec<&str> = raw
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.iter().any(|part| matches!(*part, "." | "..")) {
        return Err(FileTreeError::InvalidPath(raw.to_string()));
    }
    Ok(parts)
}

/// Canonical form of an existing-node lookup path. Malformed input maps to a key no
/// node can have.
pub(crate) fn canonical(raw: &str) -> Option<String> {
    segments(raw).ok().map(|parts| parts.join("/"))
}

pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the full path of the folder containing `full_path` (`""` for the root level).
pub fn parent_of(full_path: &str) -> &str {
    full_path
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

pub(crate) fn last_segment(full_path: &str) -> &str {
    full_path
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(full_path)
}

pub(crate) fn is_within(candidate: &str, ancestor: &str) -> bool {
    candidate == ancestor
        || (candidate.len() > ancestor.len()
            && candidate.starts_with(ancestor)
            && candidate.as_bytes()[ancestor.len()] == b'/')
}

/// Appends `.md` when the name does not already end with it.
pub fn normalize_file_name(name: &str) -> String {
    if name.ends_with(MARKDOWN_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{MARKDOWN_EXTENSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_ignore_redundant_separators() {
        assert_eq!(segments("/todo//groceries/").unwrap(), vec!["todo", "groceries"]);
        assert!(segments("   ").unwrap().is_empty());
        assert!(segments("a/../b").is_err());
    }

    #[test]
    fn parent_and_last_segment() {
        assert_eq!(parent_of("a/b/c.md"), "a/b");
        assert_eq!(parent_of("c.md"), "");
        assert_eq!(last_segment("a/b/c.md"), "c.md");
        assert_eq!(last_segment("c.md"), "c.md");
    }

    #[test]
    fn within_requires_segment_boundary() {
        assert!(is_within("todo/a.md", "todo"));
        assert!(is_within("todo", "todo"));
        assert!(!is_within("todo-list/a.md", "todo"));
        assert!(!is_within("tod", "todo"));
    }

    #[test]
    fn file_names_gain_markdown_extension() {
        assert_eq!(normalize_file_name("notes"), "notes.md");
        assert_eq!(normalize_file_name("notes.md"), "notes.md");
        assert_eq!(normalize_file_name("notes.txt"), "notes.txt.md");
    }
}
