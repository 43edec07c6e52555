use std::sync::Arc;

use chrono::NaiveDate;
use minidesk_storage::{keys, StorageKey};
use minidesk_table::{
    new_row_id, Cell, ColumnConfig, FieldConfig, FieldError, FieldValue, TableCommand,
    TableRecord,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reducer::{command_action, hydrate, Reducer, StoreEvent};
use crate::rows;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;
const DEFAULT_PRIORITY: u8 = 3;

static FIELDS: Lazy<Arc<[FieldConfig]>> = Lazy::new(|| {
    Arc::from(vec![
        FieldConfig::text("title", "Title").required(),
        FieldConfig::date("due", "Due"),
        FieldConfig::number("priority", "Priority")
            .required()
            .min(f64::from(MIN_PRIORITY))
            .max(f64::from(MAX_PRIORITY)),
        FieldConfig::read_only("done", "Done"),
    ])
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub done: bool,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl TodoItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_row_id(),
            title: title.into(),
            due: None,
            priority: DEFAULT_PRIORITY,
            done: false,
        }
    }

    /// Field rules shared by the table editor and the reducer.
    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("done", "", 28.0).with_render(|item: &Self, _| Cell::Flag(item.done)),
            ColumnConfig::new("title", "Title", 240.0),
            ColumnConfig::new("due", "Due", 100.0),
            ColumnConfig::new("priority", "Priority", 70.0),
        ]
    }
}

impl TableRecord for TodoItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "due" => self.due.map(FieldValue::Date),
            "priority" => Some(f64::from(self.priority).into()),
            "done" => Some(if self.done { "done" } else { "open" }.into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        match (key, value) {
            ("title", FieldValue::Text(title)) => self.title = title,
            ("due", FieldValue::Date(date)) => self.due = Some(date),
            ("due", value) if value.is_blank() => self.due = None,
            ("priority", FieldValue::Number(number))
                if number.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&number) =>
            {
                self.priority = number as u8;
            }
            ("title" | "due" | "priority", _) => {
                return Err(FieldError::TypeMismatch {
                    key: key.to_string(),
                    expected: match key {
                        "title" => "text",
                        "due" => "a date",
                        _ => "a whole number",
                    },
                })
            }
            _ => return Err(FieldError::UnknownField(key.to_string())),
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.title.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoState {
    #[serde(default)]
    pub items: Vec<TodoItem>,
    #[serde(skip)]
    loaded: bool,
}

impl TodoState {
    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn open_count(&self) -> usize {
        self.items.iter().filter(|item| !item.done).count()
    }
}

#[derive(Debug, Clone)]
pub enum TodoAction {
    Add {
        title: String,
        due: Option<NaiveDate>,
        priority: u8,
    },
    /// Replaces the item with the same id, typically from a table commit.
    Update(TodoItem),
    Toggle(String),
    Remove(String),
    ClearCompleted,
    Hydrate(TodoState),
}

impl TodoAction {
    pub fn from_command(command: TableCommand<TodoItem>) -> Option<Self> {
        command_action(command, TodoAction::Update, TodoAction::Remove)
    }
}

impl Reducer for TodoState {
    type Action = TodoAction;

    const KEY: StorageKey = keys::TODO;

    fn reduce(&self, action: TodoAction) -> (Self, StoreEvent) {
        debug!(?action, "todo action");
        let install = |state: &mut Self, items| state.items = items;
        match action {
            TodoAction::Add {
                title,
                due,
                priority,
            } => {
                let item = TodoItem {
                    title: title.trim().to_string(),
                    due,
                    priority,
                    ..TodoItem::new("")
                };
                let result = rows::insert(&self.items, item, &FIELDS).map(Some);
                rows::settle(self, result, install)
            }
            TodoAction::Update(item) => {
                let result = rows::replace(&self.items, item, &FIELDS);
                rows::settle(self, result, install)
            }
            TodoAction::Toggle(id) => {
                let result = rows::modify(&self.items, &id, |item| item.done = !item.done);
                rows::settle(self, Ok(result), install)
            }
            TodoAction::Remove(id) => rows::settle(self, Ok(rows::remove(&self.items, &id)), install),
            TodoAction::ClearCompleted => {
                let kept: Vec<_> = self.items.iter().filter(|item| !item.done).cloned().collect();
                let result = (kept.len() != self.items.len()).then_some(kept);
                rows::settle(self, Ok(result), install)
            }
            TodoAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> TodoAction {
        TodoAction::Hydrate(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::StoreError;
    use minidesk_table::FieldIssue;

    fn add(state: &TodoState, title: &str, priority: u8) -> (TodoState, StoreEvent) {
        state.reduce(TodoAction::Add {
            title: title.into(),
            due: None,
            priority,
        })
    }

    #[test]
    fn add_toggle_and_clear_completed() {
        let (state, event) = add(&TodoState::default(), "Water plants", 2);
        assert_eq!(event, StoreEvent::Changed);
        let (state, _) = add(&state, "Pay rent", 1);
        let id = state.items[0].id.clone();

        let (state, event) = state.reduce(TodoAction::Toggle(id.clone()));
        assert_eq!(event, StoreEvent::Changed);
        assert!(state.get(&id).unwrap().done);
        assert_eq!(state.open_count(), 1);

        let (state, _) = state.reduce(TodoAction::ClearCompleted);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].title, "Pay rent");
        let (_, event) = state.reduce(TodoAction::ClearCompleted);
        assert_eq!(event, StoreEvent::Unchanged);
    }

    #[test]
    fn invalid_items_are_refused() {
        let empty = TodoState::default();
        let (state, event) = add(&empty, "   ", 3);
        assert_eq!(state, empty);
        let Some(StoreError::Validation(error)) = event.error() else {
            panic!("expected validation error, got {event:?}");
        };
        assert_eq!(error.issue_for("title"), Some(&FieldIssue::Required));

        let (_, event) = add(&empty, "Later", 9);
        assert!(matches!(event, StoreEvent::Refused(_)));
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let (state, _) = add(&TodoState::default(), "Call mom", 3);
        let (same, event) = state.reduce(TodoAction::Remove("missing".into()));
        assert_eq!(event, StoreEvent::Unchanged);
        assert_eq!(same, state);
        let (_, event) = state.reduce(TodoAction::Toggle("missing".into()));
        assert_eq!(event, StoreEvent::Unchanged);
    }

    #[test]
    fn priority_field_rejects_fractions() {
        let mut item = TodoItem::new("x");
        assert!(item.set_field("priority", FieldValue::Number(2.5)).is_err());
        assert!(item.set_field("priority", FieldValue::Number(4.0)).is_ok());
        assert_eq!(item.priority, 4);
        item.set_field("due", FieldValue::Text(String::new())).unwrap();
        assert_eq!(item.due, None);
    }

    #[test]
    fn loaded_flag_is_not_persisted() {
        let (state, _) = TodoState::default().reduce(TodoAction::Hydrate(TodoState::default()));
        assert!(state.is_loaded());
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("loaded"));
        let back: TodoState = serde_json::from_str(&json).unwrap();
        assert!(!back.is_loaded());
    }
}
