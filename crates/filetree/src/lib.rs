//! Virtual markdown document tree: the model, its expand state and the view logic that
//! turns it into renderable rows.
//! 虛擬 Markdown 文件樹：資料模型、展開狀態與轉換為可繪製列的檢視邏輯。

mod path;

pub mod expanded;
pub mod tree;
pub mod view;

pub use expanded::ExpandedSet;
pub use path::{normalize_file_name, parent_of, MARKDOWN_EXTENSION};
pub use tree::{FileTree, FileTreeError, Node, NodeBody, NodeKind, TreeDiff};
pub use view::{flatten, TreeEvent, TreeModal, TreeOutcome, TreeRow, TreeView};
