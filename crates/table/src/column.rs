use std::fmt;

use crate::field::FieldKind;

/// Whether a cell is drawn for a row in display mode or for the row being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMode {
    Display,
    Editing,
}

/// Renderable content of one cell.
/// 單一儲存格的繪製內容。
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Free text, number or date input bound to `key`.
    Input {
        key: String,
        value: String,
        kind: FieldKind,
        error: Option<String>,
    },
    Select {
        key: String,
        value: String,
        options: Vec<String>,
        error: Option<String>,
    },
    /// Checkbox-like marker that is toggled through a store action, never inline.
    Flag(bool),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

type RenderFn<R> = Box<dyn Fn(&R, CellMode) -> Option<Cell> + Send + Sync>;

/// Declarative column: which key it shows, its header and width, and optionally a custom
/// render function. Without one, cells are derived from the matching field config.
/// 宣告式欄位設定；未提供繪製函式時依欄位設定推導儲存格。
pub struct ColumnConfig<R> {
    pub key: String,
    pub label: String,
    /// Fixed display width in points.
    pub width: f32,
    render: Option<RenderFn<R>>,
}

impl<R> ColumnConfig<R> {
    pub fn new(key: impl Into<String>, label: impl Into<String>, width: f32) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width,
            render: None,
        }
    }

    /// Overrides how the column's cells are drawn. The closure receives the row (the
    /// draft, for the row being edited) and the cell mode.
    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&R, CellMode) -> Cell + Send + Sync + 'static,
        R: 'static,
    {
        self.render = Some(Box::new(move |row: &R, mode: CellMode| Some(render(row, mode))));
        self
    }

    /// Overrides display cells only; the edited row keeps the input derived from its field.
    pub fn with_display<F>(mut self, render: F) -> Self
    where
        F: Fn(&R) -> Cell + Send + Sync + 'static,
        R: 'static,
    {
        self.render = Some(Box::new(move |row: &R, mode: CellMode| {
            (mode == CellMode::Display).then(|| render(row))
        }));
        self
    }

    pub(crate) fn custom_render(&self, row: &R, mode: CellMode) -> Option<Cell> {
        self.render.as_ref().and_then(|render| render(row, mode))
    }
}

impl<R> fmt::Debug for ColumnConfig<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnConfig")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("width", &self.width)
            .field("custom_render", &self.render.is_some())
            .finish()
    }
}
