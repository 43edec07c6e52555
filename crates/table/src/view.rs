use crate::column::{Cell, CellMode, ColumnConfig};
use crate::editor::{EditForm, TableEditor};
use crate::field::{FieldConfig, FieldKind, ValidationError};
use crate::record::TableRecord;
use crate::sort::{SortDirection, SortState};

/// Message shown in place of the body when there are no rows.
pub const DEFAULT_PLACEHOLDER: &str = "Nothing here yet";

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub width: f32,
    pub sort: Option<SortDirection>,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub editing: bool,
    pub protected: bool,
    /// Presentation hint from [`TableOptions::row_class`].
    pub class: Option<String>,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    Placeholder(String),
    Rows(Vec<RowView>),
}

/// View model of a whole table, ready for the presentation layer.
/// 提供給繪製層的整張表格檢視模型。
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub body: TableBody,
}

impl TableView {
    pub fn rows(&self) -> &[RowView] {
        match &self.body {
            TableBody::Rows(rows) => rows,
            TableBody::Placeholder(_) => &[],
        }
    }
}

type RowClassFn<'a, R> = &'a dyn Fn(&R) -> Option<String>;

/// Optional knobs for [`render_table`].
pub struct TableOptions<'a, R> {
    pub placeholder: String,
    pub row_class: Option<RowClassFn<'a, R>>,
    pub sort: Option<&'a SortState>,
}

impl<R> Default for TableOptions<'_, R> {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            row_class: None,
            sort: None,
        }
    }
}

/// Renders `data` against `columns`. The row whose id matches the editor's editing id is
/// drawn from the draft with inputs; every other row is drawn for display.
/// 依欄位設定繪製資料；編輯中的列改由暫存副本繪製為輸入欄位。
pub fn render_table<R: TableRecord>(
    data: &[R],
    columns: &[ColumnConfig<R>],
    editor: &TableEditor<R>,
    options: &TableOptions<'_, R>,
) -> TableView {
    let headers = columns
        .iter()
        .map(|column| HeaderCell {
            key: column.key.clone(),
            label: column.label.clone(),
            width: column.width,
            sort: options.sort.and_then(|sort| sort.direction_for(&column.key)),
        })
        .collect();

    if data.is_empty() {
        return TableView {
            headers,
            body: TableBody::Placeholder(options.placeholder.clone()),
        };
    }

    let ordered = match options.sort {
        Some(sort) => sort.apply(data),
        None => data.iter().collect(),
    };
    let rows = ordered
        .into_iter()
        .map(|row| {
            let form = editor.edit_form().filter(|_| editor.is_editing(row.id()));
            let cells = columns
                .iter()
                .map(|column| {
                    render_cell(column, editor.field(&column.key), row, form, editor.last_error())
                })
                .collect();
            RowView {
                id: row.id().to_string(),
                editing: form.is_some(),
                protected: row.is_protected(),
                class: options.row_class.and_then(|class| class(row)),
                cells,
            }
        })
        .collect();

    TableView {
        headers,
        body: TableBody::Rows(rows),
    }
}

fn render_cell<R: TableRecord>(
    column: &ColumnConfig<R>,
    field: Option<&FieldConfig>,
    row: &R,
    form: Option<&EditForm<R>>,
    error: Option<&ValidationError>,
) -> Cell {
    let Some(form) = form else {
        return column
            .custom_render(row, CellMode::Display)
            .unwrap_or_else(|| display_cell(row, &column.key));
    };

    let draft = form.draft();
    if let Some(cell) = column.custom_render(draft, CellMode::Editing) {
        return cell;
    }
    let key = column.key.clone();
    let error = error
        .and_then(|error| error.issue_for(&column.key))
        .map(|issue| issue.to_string());
    match field.map(|field| &field.kind) {
        Some(FieldKind::Select(options)) => Cell::Select {
            value: form.input_value(&key),
            key,
            options: options.clone(),
            error,
        },
        Some(kind) if kind.is_editable() => Cell::Input {
            value: form.input_value(&key),
            key,
            kind: kind.clone(),
            error,
        },
        _ => display_cell(draft, &column.key),
    }
}

fn display_cell<R: TableRecord>(row: &R, key: &str) -> Cell {
    match row.field(key) {
        Some(value) if !value.is_blank() => Cell::Text(value.to_string()),
        _ => Cell::Empty,
    }
}
