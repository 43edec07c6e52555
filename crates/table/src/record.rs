use thiserror::Error;

use crate::value::FieldValue;

/// Errors raised when a row is asked to store a value it cannot hold.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("field {key:?} expects {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Typed row shown by a table. The column configuration names which keys exist; the row
/// maps each key to one of its own struct fields.
/// 表格中的具型別資料列；欄位設定決定有哪些鍵，資料列負責對應到自身欄位。
pub trait TableRecord: Clone {
    /// Stable identifier assigned at creation.
    fn id(&self) -> &str;

    fn field(&self, key: &str) -> Option<FieldValue>;

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError>;

    /// Human readable name used in confirmations and notifications.
    fn display_name(&self) -> String {
        self.id().to_string()
    }

    /// Protected rows refuse deletion.
    fn is_protected(&self) -> bool {
        false
    }
}

/// Generates a fresh row identifier.
pub fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
