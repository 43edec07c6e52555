//! Declarative, column-driven table with a single-row inline editor.
//! 以欄位設定驅動、支援單列行內編輯的通用表格。

pub mod column;
pub mod editor;
pub mod field;
pub mod record;
pub mod sort;
pub mod value;
pub mod view;

pub use column::{Cell, CellMode, ColumnConfig};
pub use editor::{EditForm, TableCommand, TableEditor, TableError, TableKey};
pub use field::{validate_record, FieldConfig, FieldIssue, FieldKind, ValidationError};
pub use record::{new_row_id, FieldError, TableRecord};
pub use sort::{SortDirection, SortState};
pub use value::FieldValue;
pub use view::{
    render_table, HeaderCell, RowView, TableBody, TableOptions, TableView, DEFAULT_PLACEHOLDER,
};
