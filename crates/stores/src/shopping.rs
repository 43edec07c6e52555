use std::sync::Arc;

use minidesk_storage::{keys, StorageKey};
use minidesk_table::{
    new_row_id, Cell, ColumnConfig, FieldConfig, FieldError, FieldValue, TableCommand,
    TableRecord,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reducer::{command_action, hydrate, Reducer, StoreEvent};
use crate::rows;

static UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{0,12}$").expect("valid regex"));

static FIELDS: Lazy<Arc<[FieldConfig]>> = Lazy::new(|| {
    Arc::from(vec![
        FieldConfig::text("name", "Item").required(),
        FieldConfig::number("quantity", "Qty").required().min(0.0),
        FieldConfig::text("unit", "Unit").with_regex(UNIT.clone(), "must be a short word"),
        FieldConfig::read_only("bought", "Bought"),
    ])
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    #[serde(default = "one")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub bought: bool,
}

fn one() -> f64 {
    1.0
}

impl ShoppingItem {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            id: new_row_id(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            bought: false,
        }
    }

    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("bought", "", 28.0)
                .with_render(|item: &Self, _| Cell::Flag(item.bought)),
            ColumnConfig::new("name", "Item", 220.0),
            ColumnConfig::new("quantity", "Qty", 60.0),
            ColumnConfig::new("unit", "Unit", 70.0),
        ]
    }
}

impl TableRecord for ShoppingItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(self.name.as_str().into()),
            "quantity" => Some(self.quantity.into()),
            "unit" => Some(self.unit.as_str().into()),
            "bought" => Some(if self.bought { "yes" } else { "no" }.into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        match (key, value) {
            ("name", FieldValue::Text(name)) => self.name = name,
            ("unit", FieldValue::Text(unit)) => self.unit = unit.trim().to_string(),
            ("quantity", FieldValue::Number(quantity)) => self.quantity = quantity,
            ("name" | "unit" | "quantity", _) => {
                return Err(FieldError::TypeMismatch {
                    key: key.to_string(),
                    expected: if key == "quantity" { "a number" } else { "text" },
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
pub struct ShoppingState {
    #[serde(default)]
    pub items: Vec<ShoppingItem>,
    #[serde(skip)]
    loaded: bool,
}

impl ShoppingState {
    pub fn get(&self, id: &str) -> Option<&ShoppingItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items still to buy, in list order.
    pub fn remaining(&self) -> impl Iterator<Item = &ShoppingItem> {
        self.items.iter().filter(|item| !item.bought)
    }
}

#[derive(Debug, Clone)]
pub enum ShoppingAction {
    Add {
        name: String,
        quantity: f64,
        unit: String,
    },
    Update(ShoppingItem),
    ToggleBought(String),
    Remove(String),
    ClearBought,
    Hydrate(ShoppingState),
}

impl ShoppingAction {
    pub fn from_command(command: TableCommand<ShoppingItem>) -> Option<Self> {
        command_action(command, ShoppingAction::Update, ShoppingAction::Remove)
    }
}

impl Reducer for ShoppingState {
    type Action = ShoppingAction;

    const KEY: StorageKey = keys::SHOPPING;

    fn reduce(&self, action: ShoppingAction) -> (Self, StoreEvent) {
        debug!(?action, "shopping action");
        let install = |state: &mut Self, items| state.items = items;
        match action {
            ShoppingAction::Add {
                name,
                quantity,
                unit,
            } => {
                let item = ShoppingItem::new(name.trim(), quantity, unit.trim());
                let result = rows::insert(&self.items, item, &FIELDS).map(Some);
                rows::settle(self, result, install)
            }
            ShoppingAction::Update(item) => {
                let result = rows::replace(&self.items, item, &FIELDS);
                rows::settle(self, result, install)
            }
            ShoppingAction::ToggleBought(id) => {
                let result = rows::modify(&self.items, &id, |item| item.bought = !item.bought);
                rows::settle(self, Ok(result), install)
            }
            ShoppingAction::Remove(id) => {
                rows::settle(self, Ok(rows::remove(&self.items, &id)), install)
            }
            ShoppingAction::ClearBought => {
                let kept: Vec<_> = self.remaining().cloned().collect();
                let result = (kept.len() != self.items.len()).then_some(kept);
                rows::settle(self, Ok(result), install)
            }
            ShoppingAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> ShoppingAction {
        ShoppingAction::Hydrate(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(state: &ShoppingState, name: &str, quantity: f64, unit: &str) -> ShoppingState {
        let (next, event) = state.reduce(ShoppingAction::Add {
            name: name.into(),
            quantity,
            unit: unit.into(),
        });
        assert_eq!(event, StoreEvent::Changed);
        next
    }

    #[test]
    fn bought_items_can_be_cleared() {
        let state = add(&ShoppingState::default(), "Milk", 2.0, "l");
        let state = add(&state, "Bread", 1.0, "");
        let id = state.items[0].id.clone();
        let (state, _) = state.reduce(ShoppingAction::ToggleBought(id));
        assert_eq!(state.remaining().count(), 1);
        let (state, event) = state.reduce(ShoppingAction::ClearBought);
        assert_eq!(event, StoreEvent::Changed);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].name, "Bread");
    }

    #[test]
    fn update_is_validated() {
        let state = add(&ShoppingState::default(), "Eggs", 12.0, "pcs");
        let mut edited = state.items[0].clone();
        edited.unit = "12 pack!".into();
        let (same, event) = state.reduce(ShoppingAction::Update(edited.clone()));
        assert!(matches!(event, StoreEvent::Refused(_)));
        assert_eq!(same, state);

        edited.unit = "box".into();
        let (state, event) = state.reduce(ShoppingAction::Update(edited));
        assert_eq!(event, StoreEvent::Changed);
        assert_eq!(state.items[0].unit, "box");
    }

    #[test]
    fn negative_quantity_is_refused() {
        let (state, event) = ShoppingState::default().reduce(ShoppingAction::Add {
            name: "Apples".into(),
            quantity: -1.0,
            unit: String::new(),
        });
        assert!(state.items.is_empty());
        assert!(event.error().is_some());
    }

    #[test]
    fn table_commands_map_to_actions() {
        let item = ShoppingItem::new("Tea", 1.0, "box");
        assert!(ShoppingAction::from_command(TableCommand::None).is_none());
        assert!(matches!(
            ShoppingAction::from_command(TableCommand::Commit(item)),
            Some(ShoppingAction::Update(_))
        ));
        assert!(matches!(
            ShoppingAction::from_command(TableCommand::Remove("x".into())),
            Some(ShoppingAction::Remove(id)) if id == "x"
        ));
    }
}
