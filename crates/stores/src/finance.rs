use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use minidesk_settings::ViewMode;
use minidesk_storage::{keys, StorageKey};
use minidesk_table::{
    new_row_id, Cell, ColumnConfig, FieldConfig, FieldError, FieldValue, TableCommand,
    TableError, TableRecord,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reducer::{command_action, hydrate, refuse, Reducer, StoreError, StoreEvent};
use crate::rows;

/// Categories every finance state starts with; they cannot be deleted.
pub const BUILT_IN_CATEGORIES: [&str; 5] = ["Salary", "Housing", "Food", "Transport", "Other"];

static TRANSACTION_FIELDS: Lazy<Arc<[FieldConfig]>> = Lazy::new(|| {
    Arc::from(vec![
        FieldConfig::date("date", "Date").required(),
        FieldConfig::text("description", "Description").required(),
        FieldConfig::text("category", "Category").required(),
        FieldConfig::number("amount", "Amount").required().min(0.0),
        FieldConfig::select("kind", "Kind", TransactionKind::NAMES).required(),
    ])
});

static CATEGORY_FIELDS: Lazy<Arc<[FieldConfig]>> =
    Lazy::new(|| Arc::from(vec![FieldConfig::text("name", "Name").required()]));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub const NAMES: [&'static str; 2] = ["income", "expense"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(StoreError::Invalid(format!(
                "unknown transaction kind {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&TRANSACTION_FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("date", "Date", 96.0),
            ColumnConfig::new("description", "Description", 200.0),
            ColumnConfig::new("category", "Category", 110.0),
            ColumnConfig::new("amount", "Amount", 90.0)
                .with_display(|tx: &Self| Cell::text(format!("{:+.2}", tx.signed_amount()))),
            ColumnConfig::new("kind", "Kind", 80.0),
        ]
    }

    /// Amount with income positive and expense negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

impl TableRecord for Transaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "date" => Some(self.date.into()),
            "description" => Some(self.description.as_str().into()),
            "category" => Some(self.category.as_str().into()),
            "amount" => Some(self.amount.into()),
            "kind" => Some(self.kind.as_str().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        let mismatch = |expected| FieldError::TypeMismatch {
            key: key.to_string(),
            expected,
        };
        match (key, value) {
            ("date", FieldValue::Date(date)) => self.date = date,
            ("description", FieldValue::Text(text)) => self.description = text,
            ("category", FieldValue::Text(text)) => self.category = text.trim().to_string(),
            ("amount", FieldValue::Number(amount)) => self.amount = amount,
            ("kind", FieldValue::Text(text)) => {
                self.kind = text.parse().map_err(|_| mismatch("income or expense"))?;
            }
            ("date", _) => return Err(mismatch("a date")),
            ("amount", _) => return Err(mismatch("a number")),
            ("description" | "category" | "kind", _) => return Err(mismatch("text")),
            _ => return Err(FieldError::UnknownField(key.to_string())),
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.description.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_row_id(),
            name: name.into(),
            protected: false,
        }
    }

    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&CATEGORY_FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("name", "Category", 160.0),
            ColumnConfig::new("protected", "", 28.0)
                .with_render(|category: &Self, _| Cell::Flag(category.protected)),
        ]
    }
}

impl TableRecord for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        (key == "name").then(|| self.name.as_str().into())
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        match (key, value) {
            ("name", FieldValue::Text(name)) => {
                self.name = name.trim().to_string();
                Ok(())
            }
            ("name", _) => Err(FieldError::TypeMismatch {
                key: key.to_string(),
                expected: "text",
            }),
            _ => Err(FieldError::UnknownField(key.to_string())),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn is_protected(&self) -> bool {
        self.protected
    }
}

fn built_in_categories() -> Vec<Category> {
    BUILT_IN_CATEGORIES
        .iter()
        .map(|name| Category {
            protected: true,
            ..Category::new(*name)
        })
        .collect()
}

/// Totals over the transactions inside one view window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub expense: f64,
    pub income: f64,
}

/// Whether `date` falls into the `view` window anchored at `anchor`.
pub fn in_view(view: ViewMode, date: NaiveDate, anchor: NaiveDate) -> bool {
    match view {
        ViewMode::Month => date.year() == anchor.year() && date.month() == anchor.month(),
        ViewMode::Year => date.year() == anchor.year(),
        ViewMode::All => true,
    }
}

/// Transactions and categories of the finance page.
/// 財務頁面的交易紀錄與分類。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceState {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default = "built_in_categories")]
    pub categories: Vec<Category>,
    #[serde(skip)]
    loaded: bool,
}

impl Default for FinanceState {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            categories: built_in_categories(),
            loaded: false,
        }
    }
}

impl FinanceState {
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Transactions inside the window, newest first.
    pub fn transactions_in(&self, view: ViewMode, anchor: NaiveDate) -> Vec<&Transaction> {
        let mut selected: Vec<_> = self
            .transactions
            .iter()
            .filter(|tx| in_view(view, tx.date, anchor))
            .collect();
        selected.sort_by(|a, b| b.date.cmp(&a.date));
        selected
    }

    pub fn summary(&self, view: ViewMode, anchor: NaiveDate) -> Summary {
        let mut summary = Summary::default();
        for tx in self.transactions_in(view, anchor) {
            match tx.kind {
                TransactionKind::Income => summary.income += tx.amount,
                TransactionKind::Expense => summary.expense += tx.amount,
            }
        }
        summary.balance = summary.income - summary.expense;
        summary
    }

    /// Per-category totals inside the window, largest expense first.
    pub fn by_category(&self, view: ViewMode, anchor: NaiveDate) -> Vec<CategoryTotal> {
        let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for tx in self.transactions_in(view, anchor) {
            let entry = totals.entry(tx.category.as_str()).or_default();
            match tx.kind {
                TransactionKind::Expense => entry.0 += tx.amount,
                TransactionKind::Income => entry.1 += tx.amount,
            }
        }
        let mut totals: Vec<_> = totals
            .into_iter()
            .map(|(category, (expense, income))| CategoryTotal {
                category: category.to_string(),
                expense,
                income,
            })
            .collect();
        totals.sort_by(|a, b| b.expense.total_cmp(&a.expense));
        totals
    }

    /// Canonical spelling of `name` among existing categories.
    fn canonical_category(&self, name: &str) -> String {
        self.category(name)
            .map(|category| category.name.clone())
            .unwrap_or_else(|| name.trim().to_string())
    }

    fn with_category(&self, name: &str) -> Vec<Category> {
        let mut categories = self.categories.clone();
        if !name.is_empty() && self.category(name).is_none() {
            categories.push(Category::new(name));
        }
        categories
    }

    fn add_transaction(&self, mut tx: Transaction) -> (Self, StoreEvent) {
        tx.category = self.canonical_category(&tx.category);
        match rows::insert(&self.transactions, tx, &TRANSACTION_FIELDS) {
            Ok(transactions) => {
                let mut next = self.clone();
                if let Some(added) = transactions.last() {
                    next.categories = self.with_category(&added.category);
                }
                next.transactions = transactions;
                (next, StoreEvent::Changed)
            }
            Err(error) => refuse(self, error),
        }
    }

    fn update_transaction(&self, mut tx: Transaction) -> (Self, StoreEvent) {
        tx.category = self.canonical_category(&tx.category);
        let categories = self.with_category(&tx.category);
        let result = rows::replace(&self.transactions, tx, &TRANSACTION_FIELDS);
        rows::settle(self, result, |state, transactions| {
            state.transactions = transactions;
            state.categories = categories;
        })
    }

    fn add_category(&self, name: &str) -> (Self, StoreEvent) {
        if self.category(name).is_some() {
            return refuse(
                self,
                StoreError::Invalid(format!("category \"{}\" already exists", name.trim())),
            );
        }
        let result = rows::insert(&self.categories, Category::new(name.trim()), &CATEGORY_FIELDS);
        rows::settle(self, result.map(Some), |state, categories| {
            state.categories = categories
        })
    }

    /// Renaming a category moves its transactions along.
    fn update_category(&self, category: Category) -> (Self, StoreEvent) {
        let Some(previous) = self.categories.iter().find(|c| c.id == category.id) else {
            return (self.clone(), StoreEvent::Unchanged);
        };
        let clash = self.categories.iter().any(|other| {
            other.id != category.id && other.name.eq_ignore_ascii_case(category.name.trim())
        });
        if clash {
            return refuse(
                self,
                StoreError::Invalid(format!("category \"{}\" already exists", category.name)),
            );
        }
        let category = Category {
            protected: previous.protected,
            ..category
        };
        let old_name = previous.name.clone();
        let new_name = category.name.clone();
        let result = rows::replace(&self.categories, category, &CATEGORY_FIELDS);
        rows::settle(self, result, |state, categories| {
            state.categories = categories;
            for tx in &mut state.transactions {
                if tx.category == old_name {
                    tx.category = new_name.clone();
                }
            }
        })
    }

    fn remove_category(&self, id: &str) -> (Self, StoreEvent) {
        match self.categories.iter().find(|category| category.id == id) {
            Some(category) if category.protected => {
                refuse(self, TableError::Protected(category.name.clone()))
            }
            _ => rows::settle(
                self,
                Ok(rows::remove(&self.categories, id)),
                |state, categories| state.categories = categories,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FinanceAction {
    AddTransaction {
        date: NaiveDate,
        description: String,
        category: String,
        amount: f64,
        kind: TransactionKind,
    },
    UpdateTransaction(Transaction),
    RemoveTransaction(String),
    AddCategory(String),
    UpdateCategory(Category),
    RemoveCategory(String),
    Hydrate(FinanceState),
}

impl FinanceAction {
    pub fn from_transaction_command(command: TableCommand<Transaction>) -> Option<Self> {
        command_action(
            command,
            FinanceAction::UpdateTransaction,
            FinanceAction::RemoveTransaction,
        )
    }

    pub fn from_category_command(command: TableCommand<Category>) -> Option<Self> {
        command_action(
            command,
            FinanceAction::UpdateCategory,
            FinanceAction::RemoveCategory,
        )
    }
}

impl Reducer for FinanceState {
    type Action = FinanceAction;

    const KEY: StorageKey = keys::FINANCE;

    fn reduce(&self, action: FinanceAction) -> (Self, StoreEvent) {
        debug!(?action, "finance action");
        match action {
            FinanceAction::AddTransaction {
                date,
                description,
                category,
                amount,
                kind,
            } => self.add_transaction(Transaction {
                id: new_row_id(),
                date,
                description: description.trim().to_string(),
                category,
                amount,
                kind,
            }),
            FinanceAction::UpdateTransaction(tx) => self.update_transaction(tx),
            FinanceAction::RemoveTransaction(id) => rows::settle(
                self,
                Ok(rows::remove(&self.transactions, &id)),
                |state, transactions| state.transactions = transactions,
            ),
            FinanceAction::AddCategory(name) => self.add_category(&name),
            FinanceAction::UpdateCategory(category) => self.update_category(category),
            FinanceAction::RemoveCategory(id) => self.remove_category(&id),
            FinanceAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> FinanceAction {
        FinanceAction::Hydrate(persisted)
    }
}
