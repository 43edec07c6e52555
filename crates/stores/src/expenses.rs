use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use minidesk_storage::{keys, StorageKey};
use minidesk_table::{
    new_row_id, ColumnConfig, FieldConfig, FieldError, FieldValue, TableCommand, TableRecord,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reducer::{command_action, hydrate, Reducer, StoreEvent};
use crate::rows;

static FIELDS: Lazy<Arc<[FieldConfig]>> = Lazy::new(|| {
    Arc::from(vec![
        FieldConfig::text("name", "Name").required(),
        FieldConfig::number("amount", "Amount").required().min(0.0),
        FieldConfig::number("due_day", "Due day")
            .required()
            .min(1.0)
            .max(31.0),
        FieldConfig::text("category", "Category"),
    ])
});

/// Expense that repeats every month on `due_day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub due_day: u8,
    #[serde(default)]
    pub category: String,
}

impl RecurringExpense {
    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("name", "Name", 180.0),
            ColumnConfig::new("amount", "Amount", 90.0),
            ColumnConfig::new("due_day", "Due day", 70.0),
            ColumnConfig::new("category", "Category", 110.0),
        ]
    }

    /// Date this expense falls due in the given month. Days past the end of a short month
    /// fall on its last day.
    pub fn due_date(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let last = last_day_of_month(year, month)?;
        NaiveDate::from_ymd_opt(year, month, u32::from(self.due_day).min(last))
    }
}

pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .filter(|_| (1..=12).contains(&month))
        .map(|last| last.day())
}

impl TableRecord for RecurringExpense {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(self.name.as_str().into()),
            "amount" => Some(self.amount.into()),
            "due_day" => Some(f64::from(self.due_day).into()),
            "category" => Some(self.category.as_str().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        match (key, value) {
            ("name", FieldValue::Text(name)) => self.name = name,
            ("category", FieldValue::Text(category)) => self.category = category.trim().into(),
            ("amount", FieldValue::Number(amount)) => self.amount = amount,
            ("due_day", FieldValue::Number(day))
                if day.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&day) =>
            {
                self.due_day = day as u8;
            }
            ("name" | "category" | "amount" | "due_day", _) => {
                return Err(FieldError::TypeMismatch {
                    key: key.to_string(),
                    expected: match key {
                        "amount" => "a number",
                        "due_day" => "a whole number",
                        _ => "text",
                    },
                })
            }
            _ => return Err(FieldError::UnknownField(key.to_string())),
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensesState {
    #[serde(default)]
    pub items: Vec<RecurringExpense>,
    #[serde(skip)]
    loaded: bool,
}

impl ExpensesState {
    /// Sum of every recurring expense, i.e. what one month costs.
    pub fn monthly_total(&self) -> f64 {
        self.items.iter().map(|item| item.amount).sum()
    }

    /// Expenses falling due in the given month, ordered by date.
    pub fn due_in(&self, year: i32, month: u32) -> Vec<(NaiveDate, &RecurringExpense)> {
        let mut due: Vec<_> = self
            .items
            .iter()
            .filter_map(|item| item.due_date(year, month).map(|date| (date, item)))
            .collect();
        due.sort_by_key(|(date, _)| *date);
        due
    }
}

#[derive(Debug, Clone)]
pub enum ExpenseAction {
    Add {
        name: String,
        amount: f64,
        due_day: u8,
        category: String,
    },
    Update(RecurringExpense),
    Remove(String),
    Hydrate(ExpensesState),
}

impl ExpenseAction {
    pub fn from_command(command: TableCommand<RecurringExpense>) -> Option<Self> {
        command_action(command, ExpenseAction::Update, ExpenseAction::Remove)
    }
}

impl Reducer for ExpensesState {
    type Action = ExpenseAction;

    const KEY: StorageKey = keys::EXPENSES;

    fn reduce(&self, action: ExpenseAction) -> (Self, StoreEvent) {
        debug!(?action, "expenses action");
        let install = |state: &mut Self, items| state.items = items;
        match action {
            ExpenseAction::Add {
                name,
                amount,
                due_day,
                category,
            } => {
                let item = RecurringExpense {
                    id: new_row_id(),
                    name: name.trim().to_string(),
                    amount,
                    due_day,
                    category: category.trim().to_string(),
                };
                let result = rows::insert(&self.items, item, &FIELDS).map(Some);
                rows::settle(self, result, install)
            }
            ExpenseAction::Update(item) => {
                let result = rows::replace(&self.items, item, &FIELDS);
                rows::settle(self, result, install)
            }
            ExpenseAction::Remove(id) => {
                rows::settle(self, Ok(rows::remove(&self.items, &id)), install)
            }
            ExpenseAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> ExpenseAction {
        ExpenseAction::Hydrate(persisted)
    }
}
