use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::field::{FieldConfig, FieldIssue, ValidationError};
use crate::record::TableRecord;

/// Keys the editor reacts to while focus is inside the editing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey {
    Enter,
    Escape,
    Other,
}

/// Change the owner of the rows should apply.
/// 表格要求資料擁有者套用的變更。
#[derive(Debug, Clone, PartialEq)]
pub enum TableCommand<R> {
    None,
    /// Replace the row with the same id by this value.
    Commit(R),
    /// Remove the row with this id.
    Remove(String),
}

impl<R: TableRecord> TableCommand<R> {
    /// Applies the command to an owned row list, returning the new list.
    pub fn apply(self, rows: &[R]) -> Vec<R> {
        match self {
            TableCommand::None => rows.to_vec(),
            TableCommand::Commit(updated) => rows
                .iter()
                .map(|row| {
                    if row.id() == updated.id() {
                        updated.clone()
                    } else {
                        row.clone()
                    }
                })
                .collect(),
            TableCommand::Remove(id) => rows.iter().filter(|row| row.id() != id).cloned().collect(),
        }
    }
}

/// Errors from table handlers other than validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("\"{0}\" is protected and cannot be deleted")]
    Protected(String),
}

/// Staged copy of the row being edited. It is a full clone of the row, so it always
/// has the row's key set; inputs that could not be parsed are kept as raw text.
/// 編輯中資料列的暫存副本；無法解析的輸入以原始文字保留。
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm<R> {
    draft: R,
    unparsed: BTreeMap<String, String>,
}

impl<R: TableRecord> EditForm<R> {
    fn seed(row: &R) -> Self {
        Self {
            draft: row.clone(),
            unparsed: BTreeMap::new(),
        }
    }

    pub fn draft(&self) -> &R {
        &self.draft
    }

    /// Text to show in the input for `key`.
    pub fn input_value(&self, key: &str) -> String {
        match self.unparsed.get(key) {
            Some(raw) => raw.clone(),
            None => self
                .draft
                .field(key)
                .filter(|value| !value.is_blank())
                .map(|value| value.to_input())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EditState<R> {
    Idle,
    Editing { id: String, form: EditForm<R> },
}

/// Per-table edit state machine: `Idle` or `Editing(row id)`. At most one row is in
/// edit mode; starting an edit on another row silently replaces the draft.
/// 每個表格實例的編輯狀態機；同一時間最多只有一列處於編輯狀態。
#[derive(Debug, Clone)]
pub struct TableEditor<R> {
    fields: Arc<[FieldConfig]>,
    state: EditState<R>,
    last_error: Option<ValidationError>,
}

impl<R: TableRecord> TableEditor<R> {
    pub fn new(fields: impl Into<Arc<[FieldConfig]>>) -> Self {
        Self {
            fields: fields.into(),
            state: EditState::Idle,
            last_error: None,
        }
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn editing_id(&self) -> Option<&str> {
        match &self.state {
            EditState::Idle => None,
            EditState::Editing { id, .. } => Some(id),
        }
    }

    pub fn edit_form(&self) -> Option<&EditForm<R>> {
        match &self.state {
            EditState::Idle => None,
            EditState::Editing { form, .. } => Some(form),
        }
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.editing_id() == Some(id)
    }

    /// Validation failure from the last save attempt of the current edit.
    pub fn last_error(&self) -> Option<&ValidationError> {
        self.last_error.as_ref()
    }

    /// Enters edit mode for `item`, seeding the draft with a copy of it.
    pub fn start_edit(&mut self, item: &R) {
        if let Some(previous) = self.editing_id().filter(|id| *id != item.id()) {
            debug!(previous, next = item.id(), "replacing edit draft");
        }
        self.state = EditState::Editing {
            id: item.id().to_string(),
            form: EditForm::seed(item),
        };
        self.last_error = None;
    }

    /// Stages raw input for `key`. Ignored when idle or for fields that are not editable.
    pub fn edit_change(&mut self, key: &str, raw: &str) {
        let Some(field) = self
            .fields
            .iter()
            .find(|field| field.key == key && field.kind.is_editable())
        else {
            return;
        };
        let EditState::Editing { form, .. } = &mut self.state else {
            return;
        };
        let parsed = field.parse(raw).ok();
        let stored = parsed.is_some_and(|value| form.draft.set_field(key, value).is_ok());
        if stored {
            form.unparsed.remove(key);
        } else {
            form.unparsed.insert(key.to_string(), raw.to_string());
        }
        if let Some(error) = self.last_error.as_mut() {
            error.issues.retain(|(field, _, _)| field != key);
        }
        if self
            .last_error
            .as_ref()
            .is_some_and(|error| error.issues.is_empty())
        {
            self.last_error = None;
        }
    }

    /// Validates the draft and returns the row to commit. Edit mode stays open either
    /// way: the owner calls [`TableEditor::finish_edit`] once it accepted the row, so a
    /// commit it refuses keeps the draft.
    /// 驗證草稿並回傳要提交的資料列；提交被接受後才由擁有者呼叫 `finish_edit`。
    pub fn save_edit(&mut self) -> Result<TableCommand<R>, ValidationError> {
        let EditState::Editing { form, .. } = &self.state else {
            return Ok(TableCommand::None);
        };

        let mut issues = Vec::new();
        for field in self.fields.iter() {
            let issue = match form.unparsed.get(&field.key) {
                // Raw input that parses and validates was still refused by the row.
                Some(raw) => field
                    .parse(raw)
                    .and_then(|value| field.validate(Some(&value)))
                    .and(Err(FieldIssue::Unsupported)),
                None => field.validate(form.draft.field(&field.key).as_ref()),
            };
            if let Err(issue) = issue {
                issues.push((field.key.clone(), field.label.clone(), issue));
            }
        }

        if !issues.is_empty() {
            let error = ValidationError { issues };
            debug!(%error, "edit rejected");
            self.last_error = Some(error.clone());
            return Err(error);
        }

        self.last_error = None;
        Ok(TableCommand::Commit(form.draft.clone()))
    }

    /// Leaves edit mode after the owner applied the committed row.
    pub fn finish_edit(&mut self) {
        if let Some(id) = self.editing_id() {
            debug!(id, "edit committed");
        }
        self.cancel_edit();
    }

    /// Drops the draft without committing.
    pub fn cancel_edit(&mut self) {
        self.state = EditState::Idle;
        self.last_error = None;
    }

    /// Requests removal of row `id`. Protected rows are refused. Deleting the row being
    /// edited clears the edit state first.
    pub fn delete(
        &mut self,
        id: &str,
        name: &str,
        is_protected: bool,
    ) -> Result<TableCommand<R>, TableError> {
        if is_protected {
            return Err(TableError::Protected(name.to_string()));
        }
        if self.is_editing(id) {
            self.cancel_edit();
        }
        Ok(TableCommand::Remove(id.to_string()))
    }

    /// Convenience over [`TableEditor::delete`] using the row's own name and flag.
    pub fn delete_row(&mut self, row: &R) -> Result<TableCommand<R>, TableError> {
        self.delete(row.id(), &row.display_name(), row.is_protected())
    }

    /// Enter saves, Escape cancels; other keys do nothing.
    pub fn key_down(&mut self, key: TableKey) -> Result<TableCommand<R>, ValidationError> {
        match key {
            TableKey::Enter => self.save_edit(),
            TableKey::Escape => {
                self.cancel_edit();
                Ok(TableCommand::None)
            }
            TableKey::Other => Ok(TableCommand::None),
        }
    }

    /// Leaves edit mode when the edited row disappeared from `rows` by other means.
    pub fn reconcile(&mut self, rows: &[R]) {
        let gone = self
            .editing_id()
            .is_some_and(|id| !rows.iter().any(|row| row.id() == id));
        if gone {
            self.cancel_edit();
        }
    }
}
