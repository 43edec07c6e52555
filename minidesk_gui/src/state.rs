use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Months, NaiveDate};
use minidesk_filetree::{TreeDiff, TreeEvent, TreeView};
use minidesk_settings::{Preferences, ThemeChoice, ViewMode};
use minidesk_storage::{SharedStore, StorageKey};
use minidesk_stores::{
    CalendarAction, CalendarEvent, CalendarState, Category, ExpenseAction, ExpensesState,
    FinanceAction, FinanceState, NotesAction, NotesState, Notifications, RecurringExpense,
    Reducer, ShoppingAction, ShoppingItem, ShoppingState, StoreEvent, StoreHost, TodoAction,
    TodoItem, TodoState, Transaction, TransactionKind, WriteThrough,
};
use minidesk_table::{
    render_table, ColumnConfig, FieldConfig, SortState, TableCommand, TableEditor, TableKey,
    TableOptions, TableRecord, TableView,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Todo,
    Shopping,
    Notes,
    Finance,
    Expenses,
    Calendar,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Todo,
        Page::Shopping,
        Page::Notes,
        Page::Finance,
        Page::Expenses,
        Page::Calendar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Page::Todo => "Todo",
            Page::Shopping => "Shopping",
            Page::Notes => "Notes",
            Page::Finance => "Finance",
            Page::Expenses => "Expenses",
            Page::Calendar => "Calendar",
        }
    }
}

/// Interaction reported by a drawn table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableInput {
    StartEdit(String),
    Change { key: String, raw: String },
    Key(TableKey),
    Delete(String),
    /// Click on a flag cell of row `id`.
    Flag(String),
    Sort(String),
}

/// Rows a feature state exposes to one of its tables.
pub trait Rows<T> {
    fn rows(&self) -> &[T];
}

impl Rows<TodoItem> for TodoState {
    fn rows(&self) -> &[TodoItem] {
        &self.items
    }
}

impl Rows<ShoppingItem> for ShoppingState {
    fn rows(&self) -> &[ShoppingItem] {
        &self.items
    }
}

impl Rows<Transaction> for FinanceState {
    fn rows(&self) -> &[Transaction] {
        &self.transactions
    }
}

impl Rows<Category> for FinanceState {
    fn rows(&self) -> &[Category] {
        &self.categories
    }
}

impl Rows<RecurringExpense> for ExpensesState {
    fn rows(&self) -> &[RecurringExpense] {
        &self.items
    }
}

impl Rows<CalendarEvent> for CalendarState {
    fn rows(&self) -> &[CalendarEvent] {
        &self.events
    }
}

/// Editor, sort order and columns of one on-screen table.
/// 單一表格的編輯器、排序狀態與欄位設定。
pub struct TablePanel<T> {
    pub editor: TableEditor<T>,
    pub sort: SortState,
    columns: Vec<ColumnConfig<T>>,
}

impl<T: TableRecord> TablePanel<T> {
    pub fn new(fields: Arc<[FieldConfig]>, columns: Vec<ColumnConfig<T>>) -> Self {
        Self {
            editor: TableEditor::new(fields),
            sort: SortState::default(),
            columns,
        }
    }

    pub fn view(
        &self,
        rows: &[T],
        placeholder: &str,
        row_class: Option<&dyn Fn(&T) -> Option<String>>,
    ) -> TableView {
        let options = TableOptions {
            placeholder: placeholder.to_string(),
            row_class,
            sort: Some(&self.sort),
        };
        render_table(rows, &self.columns, &self.editor, &options)
    }

    /// Feeds one interaction to the editor. Validation failures stay on the editor and
    /// show inline; other refusals come back as a message.
    pub fn handle(&mut self, rows: &[T], input: TableInput) -> Result<TableCommand<T>, String> {
        let find = |id: &str| rows.iter().find(|row| row.id() == id);
        match input {
            TableInput::StartEdit(id) => {
                if let Some(row) = find(&id) {
                    self.editor.start_edit(row);
                }
                Ok(TableCommand::None)
            }
            TableInput::Change { key, raw } => {
                self.editor.edit_change(&key, &raw);
                Ok(TableCommand::None)
            }
            TableInput::Key(key) => match self.editor.key_down(key) {
                Ok(command) => Ok(command),
                Err(error) => {
                    debug!(%error, "inline edit rejected");
                    Ok(TableCommand::None)
                }
            },
            TableInput::Delete(id) => match find(&id) {
                Some(row) => self.editor.delete_row(row).map_err(|error| error.to_string()),
                None => Ok(TableCommand::None),
            },
            TableInput::Sort(key) => {
                self.sort.toggle(&key);
                Ok(TableCommand::None)
            }
            TableInput::Flag(_) => Ok(TableCommand::None),
        }
    }
}

/// Text typed into the "add" rows above each table.
#[derive(Debug, Clone)]
pub struct Drafts {
    pub todo_title: String,
    pub todo_due: String,
    pub todo_priority: u8,
    pub shopping_name: String,
    pub shopping_quantity: f64,
    pub shopping_unit: String,
    pub tx_description: String,
    pub tx_amount: String,
    pub tx_category: String,
    pub tx_kind: TransactionKind,
    pub tx_date: String,
    pub category_name: String,
    pub expense_name: String,
    pub expense_amount: String,
    pub expense_due_day: u8,
    pub expense_category: String,
    pub event_title: String,
    pub event_time: String,
    pub event_notes: String,
}

impl Default for Drafts {
    fn default() -> Self {
        Self {
            todo_title: String::new(),
            todo_due: String::new(),
            todo_priority: 3,
            shopping_name: String::new(),
            shopping_quantity: 1.0,
            shopping_unit: String::new(),
            tx_description: String::new(),
            tx_amount: String::new(),
            tx_category: "Other".to_string(),
            tx_kind: TransactionKind::Expense,
            tx_date: String::new(),
            category_name: String::new(),
            expense_name: String::new(),
            expense_amount: String::new(),
            expense_due_day: 1,
            expense_category: String::new(),
            event_title: String::new(),
            event_time: String::new(),
            event_notes: String::new(),
        }
    }
}

/// Everything the desktop shell shows, independent of egui.
/// 桌面介面的完整狀態，與 egui 無關，可直接測試。
pub struct Desk {
    pub page: Page,
    store: SharedStore,
    pub theme: ThemeChoice,
    pub currency: String,
    pub todo: StoreHost<TodoState>,
    pub shopping: StoreHost<ShoppingState>,
    pub notes: StoreHost<NotesState>,
    pub finance: StoreHost<FinanceState>,
    pub expenses: StoreHost<ExpensesState>,
    pub calendar: StoreHost<CalendarState>,
    pub todo_table: TablePanel<TodoItem>,
    pub shopping_table: TablePanel<ShoppingItem>,
    pub transaction_table: TablePanel<Transaction>,
    pub category_table: TablePanel<Category>,
    pub expense_table: TablePanel<RecurringExpense>,
    pub event_table: TablePanel<CalendarEvent>,
    pub tree_view: TreeView,
    pub notifications: Notifications,
    pub drafts: Drafts,
    pub finance_view: ViewMode,
    pub today: NaiveDate,
    /// First day of the month shown on the calendar page.
    pub calendar_month: NaiveDate,
    pub calendar_day: NaiveDate,
    write_through: WriteThrough,
    failing_saves: HashSet<StorageKey>,
}

impl Desk {
    pub fn new(store: SharedStore, preferences: &Preferences, today: NaiveDate) -> Self {
        Self {
            page: Page::Todo,
            store,
            theme: preferences.ui.theme,
            currency: preferences.finance.currency.clone(),
            todo: StoreHost::default(),
            shopping: StoreHost::default(),
            notes: StoreHost::default(),
            finance: StoreHost::default(),
            expenses: StoreHost::default(),
            calendar: StoreHost::default(),
            todo_table: TablePanel::new(TodoItem::fields(), TodoItem::columns()),
            shopping_table: TablePanel::new(ShoppingItem::fields(), ShoppingItem::columns()),
            transaction_table: TablePanel::new(Transaction::fields(), Transaction::columns()),
            category_table: TablePanel::new(Category::fields(), Category::columns()),
            expense_table: TablePanel::new(RecurringExpense::fields(), RecurringExpense::columns()),
            event_table: TablePanel::new(CalendarEvent::fields(), CalendarEvent::columns()),
            tree_view: TreeView::new(),
            notifications: Notifications::from_preferences(&preferences.ui),
            drafts: Drafts::default(),
            finance_view: preferences.finance.default_view,
            today,
            calendar_month: today.with_day(1).unwrap_or(today),
            calendar_day: today,
            write_through: WriteThrough::from_preferences(&preferences.storage),
            failing_saves: HashSet::new(),
        }
    }

    /// Issues the background reads for every store.
    pub fn begin_hydration(&mut self) {
        self.todo.begin_hydration(&self.store);
        self.shopping.begin_hydration(&self.store);
        self.notes.begin_hydration(&self.store);
        self.finance.begin_hydration(&self.store);
        self.expenses.begin_hydration(&self.store);
        self.calendar.begin_hydration(&self.store);
    }

    pub fn is_hydrating(&self) -> bool {
        self.todo.is_hydrating()
            || self.shopping.is_hydrating()
            || self.notes.is_hydrating()
            || self.finance.is_hydrating()
            || self.expenses.is_hydrating()
            || self.calendar.is_hydrating()
    }

    /// Applies hydration results that arrived since the last frame.
    pub fn poll_hydration(&mut self) {
        let notifications = &mut self.notifications;
        poll_one(&mut self.todo, notifications);
        poll_one(&mut self.shopping, notifications);
        poll_one(&mut self.finance, notifications);
        poll_one(&mut self.expenses, notifications);
        poll_one(&mut self.calendar, notifications);
        if poll_one(&mut self.notes, notifications) {
            self.tree_view.sync(&self.notes.state().tree);
        }
    }

    /// Per-frame housekeeping: debounced saves and toast expiry.
    pub fn tick(&mut self, now: Instant) {
        let mut saver = Saver {
            write_through: &mut self.write_through,
            store: &self.store,
            failing: &mut self.failing_saves,
            notifications: &mut self.notifications,
        };
        saver.tick(&self.todo, now);
        saver.tick(&self.shopping, now);
        saver.tick(&self.notes, now);
        saver.tick(&self.finance, now);
        saver.tick(&self.expenses, now);
        saver.tick(&self.calendar, now);
        self.notifications.prune(now);
    }

    /// Whether a store has changes the write-through has not saved yet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.write_through.is_dirty(&self.todo)
            || self.write_through.is_dirty(&self.shopping)
            || self.write_through.is_dirty(&self.notes)
            || self.write_through.is_dirty(&self.finance)
            || self.write_through.is_dirty(&self.expenses)
            || self.write_through.is_dirty(&self.calendar)
    }

    pub fn save_debounce(&self) -> std::time::Duration {
        self.write_through.debounce()
    }

    /// Saves every dirty store right away. Used when the window closes.
    pub fn flush(&mut self) {
        let store = self.store.as_ref();
        let write_through = &mut self.write_through;
        let results = [
            write_through.flush(&self.todo, store),
            write_through.flush(&self.shopping, store),
            write_through.flush(&self.notes, store),
            write_through.flush(&self.finance, store),
            write_through.flush(&self.expenses, store),
            write_through.flush(&self.calendar, store),
        ];
        for error in results.into_iter().filter_map(Result::err) {
            warn!(%error, "could not save on exit");
        }
    }

    pub fn tree_event(&mut self, event: TreeEvent) {
        let outcome = self.tree_view.handle(event);
        if let Some(action) = NotesAction::from_outcome(outcome) {
            match self.notes.dispatch(action) {
                StoreEvent::TreeChanged(diff) => self.tree_view.complete(Ok(&diff)),
                StoreEvent::Refused(error) => self.tree_view.complete(Err(error.to_string())),
                _ => self.tree_view.complete(Ok(&TreeDiff::default())),
            }
        }
        self.tree_view.sync(&self.notes.state().tree);
    }

    pub fn delete_note(&mut self, path: &str) {
        let event = self.notes.dispatch(NotesAction::Delete(path.to_string()));
        if let StoreEvent::TreeChanged(diff) = &event {
            self.tree_view.complete(Ok(diff));
            self.notifications.info(format!("Deleted {path}"));
        }
        self.tree_view.sync(&self.notes.state().tree);
    }

    pub fn update_note(&mut self, path: &str, content: String) {
        let event = self.notes.dispatch(NotesAction::UpdateContent {
            path: path.to_string(),
            content,
        });
        report(&mut self.notifications, event);
    }

    pub fn todo_input(&mut self, input: TableInput) {
        if let TableInput::Flag(id) = input {
            report(&mut self.notifications, self.todo.dispatch(TodoAction::Toggle(id)));
            return;
        }
        drive(
            &mut self.todo,
            &mut self.todo_table,
            &mut self.notifications,
            input,
            TodoAction::from_command,
        );
    }

    pub fn shopping_input(&mut self, input: TableInput) {
        if let TableInput::Flag(id) = input {
            let event = self.shopping.dispatch(ShoppingAction::ToggleBought(id));
            report(&mut self.notifications, event);
            return;
        }
        drive(
            &mut self.shopping,
            &mut self.shopping_table,
            &mut self.notifications,
            input,
            ShoppingAction::from_command,
        );
    }

    pub fn transaction_input(&mut self, input: TableInput) {
        drive(
            &mut self.finance,
            &mut self.transaction_table,
            &mut self.notifications,
            input,
            FinanceAction::from_transaction_command,
        );
    }

    pub fn category_input(&mut self, input: TableInput) {
        drive(
            &mut self.finance,
            &mut self.category_table,
            &mut self.notifications,
            input,
            FinanceAction::from_category_command,
        );
    }

    pub fn expense_input(&mut self, input: TableInput) {
        drive(
            &mut self.expenses,
            &mut self.expense_table,
            &mut self.notifications,
            input,
            ExpenseAction::from_command,
        );
    }

    pub fn event_input(&mut self, input: TableInput) {
        drive(
            &mut self.calendar,
            &mut self.event_table,
            &mut self.notifications,
            input,
            CalendarAction::from_command,
        );
    }

    pub fn add_todo(&mut self) {
        let due = match parse_optional_date(&self.drafts.todo_due) {
            Ok(due) => due,
            Err(message) => {
                self.notifications.error(message);
                return;
            }
        };
        let action = TodoAction::Add {
            title: self.drafts.todo_title.trim().to_string(),
            due,
            priority: self.drafts.todo_priority,
        };
        if report(&mut self.notifications, self.todo.dispatch(action)) {
            self.drafts.todo_title.clear();
            self.drafts.todo_due.clear();
        }
    }

    pub fn clear_completed_todos(&mut self) {
        report(&mut self.notifications, self.todo.dispatch(TodoAction::ClearCompleted));
    }

    pub fn add_shopping_item(&mut self) {
        let action = ShoppingAction::Add {
            name: self.drafts.shopping_name.trim().to_string(),
            quantity: self.drafts.shopping_quantity,
            unit: self.drafts.shopping_unit.trim().to_string(),
        };
        if report(&mut self.notifications, self.shopping.dispatch(action)) {
            self.drafts.shopping_name.clear();
            self.drafts.shopping_quantity = 1.0;
            self.drafts.shopping_unit.clear();
        }
    }

    pub fn clear_bought(&mut self) {
        let event = self.shopping.dispatch(ShoppingAction::ClearBought);
        report(&mut self.notifications, event);
    }

    pub fn add_transaction(&mut self) {
        let parsed = parse_amount(&self.drafts.tx_amount).and_then(|amount| {
            let date = parse_optional_date(&self.drafts.tx_date)?.unwrap_or(self.today);
            Ok((amount, date))
        });
        let (amount, date) = match parsed {
            Ok(parsed) => parsed,
            Err(message) => {
                self.notifications.error(message);
                return;
            }
        };
        let action = FinanceAction::AddTransaction {
            date,
            description: self.drafts.tx_description.trim().to_string(),
            category: self.drafts.tx_category.trim().to_string(),
            amount,
            kind: self.drafts.tx_kind,
        };
        if report(&mut self.notifications, self.finance.dispatch(action)) {
            self.drafts.tx_description.clear();
            self.drafts.tx_amount.clear();
            self.drafts.tx_date.clear();
            self.notifications.success("Transaction added");
        }
    }

    pub fn add_category(&mut self) {
        let action = FinanceAction::AddCategory(self.drafts.category_name.trim().to_string());
        if report(&mut self.notifications, self.finance.dispatch(action)) {
            self.drafts.category_name.clear();
        }
    }

    pub fn add_expense(&mut self) {
        let amount = match parse_amount(&self.drafts.expense_amount) {
            Ok(amount) => amount,
            Err(message) => {
                self.notifications.error(message);
                return;
            }
        };
        let action = ExpenseAction::Add {
            name: self.drafts.expense_name.trim().to_string(),
            amount,
            due_day: self.drafts.expense_due_day,
            category: self.drafts.expense_category.trim().to_string(),
        };
        if report(&mut self.notifications, self.expenses.dispatch(action)) {
            self.drafts.expense_name.clear();
            self.drafts.expense_amount.clear();
        }
    }

    /// Adds an event on the selected calendar day.
    pub fn add_event(&mut self) {
        let time = match CalendarEvent::parse_time(&self.drafts.event_time) {
            Ok(time) => time,
            Err(_) => {
                self.notifications
                    .error(format!("{:?} is not a time like 14:30", self.drafts.event_time));
                return;
            }
        };
        let action = CalendarAction::Add {
            title: self.drafts.event_title.trim().to_string(),
            date: self.calendar_day,
            time,
            notes: self.drafts.event_notes.trim().to_string(),
        };
        if report(&mut self.notifications, self.calendar.dispatch(action)) {
            self.drafts.event_title.clear();
            self.drafts.event_time.clear();
            self.drafts.event_notes.clear();
        }
    }

    /// Moves the calendar page by whole months.
    pub fn shift_month(&mut self, delta: i32) {
        let months = Months::new(delta.unsigned_abs());
        let shifted = if delta >= 0 {
            self.calendar_month.checked_add_months(months)
        } else {
            self.calendar_month.checked_sub_months(months)
        };
        if let Some(month) = shifted {
            self.calendar_month = month;
        }
    }
}

/// Polls one host; true when its hydration landed this frame.
fn poll_one<R: Reducer>(host: &mut StoreHost<R>, notifications: &mut Notifications) -> bool {
    match host.poll_hydration() {
        Some(event) => {
            report(notifications, event);
            true
        }
        None => false,
    }
}

/// Turns a refusal into an error toast. True when the state changed.
fn report(notifications: &mut Notifications, event: StoreEvent) -> bool {
    if let Some(error) = event.error() {
        notifications.error(error.to_string());
        return false;
    }
    event.is_change()
}

fn drive<R, T>(
    host: &mut StoreHost<R>,
    panel: &mut TablePanel<T>,
    notifications: &mut Notifications,
    input: TableInput,
    to_action: fn(TableCommand<T>) -> Option<R::Action>,
) where
    R: Reducer + Rows<T>,
    T: TableRecord,
{
    let command = match panel.handle(host.state().rows(), input) {
        Ok(command) => command,
        Err(message) => {
            notifications.error(message);
            return;
        }
    };
    let commits = matches!(command, TableCommand::Commit(_));
    let accepted = match to_action(command) {
        Some(action) => {
            let event = host.dispatch(action);
            let refused = event.error().is_some();
            report(notifications, event);
            !refused
        }
        None => true,
    };
    // A refused commit keeps the row in edit mode with its draft.
    if commits && accepted {
        panel.editor.finish_edit();
    }
    panel.editor.reconcile(host.state().rows());
}

struct Saver<'a> {
    write_through: &'a mut WriteThrough,
    store: &'a SharedStore,
    failing: &'a mut HashSet<StorageKey>,
    notifications: &'a mut Notifications,
}

impl Saver<'_> {
    /// Only the first failure of a streak is toasted; the write-through keeps retrying.
    fn tick<R: Reducer>(&mut self, host: &StoreHost<R>, now: Instant) {
        match self.write_through.tick(host, self.store.as_ref(), now) {
            Ok(true) => {
                self.failing.remove(&R::KEY);
            }
            Ok(false) => {}
            Err(error) => {
                if self.failing.insert(R::KEY) {
                    self.notifications
                        .error(format!("Could not save {}: {error}", R::KEY));
                }
            }
        }
    }
}

fn parse_optional_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<NaiveDate>()
        .map(Some)
        .map_err(|_| format!("{raw:?} is not a date (YYYY-MM-DD)"))
}

fn parse_amount(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| format!("{:?} is not an amount", raw.trim()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use minidesk_storage::{keys, KeyValueStore, KeyValueStoreExt, MemoryStore};
    use minidesk_stores::NotificationKind;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn desk_with(store: Arc<MemoryStore>) -> Desk {
        let shared: SharedStore = store;
        Desk::new(shared, &Preferences::default(), day(2024, 3, 15))
    }

    fn wait_for_hydration(desk: &mut Desk) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while desk.is_hydrating() && Instant::now() < deadline {
            desk.poll_hydration();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!desk.is_hydrating(), "hydration did not finish");
    }

    #[test]
    fn hydration_restores_saved_stores_without_marking_them_dirty() {
        let store = Arc::new(MemoryStore::new());
        let mut seeded = StoreHost::<TodoState>::default();
        seeded.dispatch(TodoAction::Add {
            title: "Pay rent".into(),
            due: None,
            priority: 1,
        });
        seeded.save(store.as_ref()).unwrap();

        let mut desk = desk_with(store);
        desk.begin_hydration();
        wait_for_hydration(&mut desk);
        assert_eq!(desk.todo.state().items.len(), 1);
        assert!(desk.todo.state().is_loaded());
        assert!(!desk.has_unsaved_changes());
    }

    #[test]
    fn added_rows_are_saved_after_the_debounce() {
        let store = Arc::new(MemoryStore::new());
        let mut desk = desk_with(store.clone());
        desk.drafts.shopping_name = "Milk".into();
        desk.drafts.shopping_unit = "l".into();
        desk.add_shopping_item();
        assert!(desk.drafts.shopping_name.is_empty());
        assert!(desk.has_unsaved_changes());

        let start = Instant::now();
        desk.tick(start);
        assert!(store.keys().unwrap().is_empty());
        desk.tick(start + desk.save_debounce() + Duration::from_millis(1));
        let saved: ShoppingState = store.get_sync(&keys::SHOPPING).unwrap();
        assert_eq!(saved.items[0].name, "Milk");
        assert!(!desk.has_unsaved_changes());
    }

    #[test]
    fn inline_edit_commits_through_the_store() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        desk.drafts.todo_title = "Water plants".into();
        desk.add_todo();
        let id = desk.todo.state().items[0].id.clone();

        desk.todo_input(TableInput::StartEdit(id.clone()));
        desk.todo_input(TableInput::Change {
            key: "priority".into(),
            raw: "9".into(),
        });
        desk.todo_input(TableInput::Key(TableKey::Enter));
        assert_eq!(desk.todo_table.editor.editing_id(), Some(id.as_str()));
        let view = desk.todo_table.view(desk.todo.state().rows(), "", None);
        assert!(view.rows()[0].editing);

        desk.todo_input(TableInput::Change {
            key: "priority".into(),
            raw: "2".into(),
        });
        desk.todo_input(TableInput::Key(TableKey::Enter));
        assert_eq!(desk.todo_table.editor.editing_id(), None);
        assert_eq!(desk.todo.state().items[0].priority, 2);

        desk.todo_input(TableInput::Flag(id));
        assert!(desk.todo.state().items[0].done);
    }

    #[test]
    fn protected_category_delete_shows_an_error_toast() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        let salary = desk.finance.state().category("Salary").unwrap().id.clone();
        desk.category_input(TableInput::Delete(salary));
        assert_eq!(desk.finance.state().categories.len(), 5);
        let toasts: Vec<_> = desk.notifications.visible(Instant::now()).collect();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, NotificationKind::Error);
        assert!(toasts[0].message.contains("Salary"));
    }

    #[test]
    fn category_rename_clash_keeps_the_edit_open() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        desk.drafts.category_name = "Gym".into();
        desk.add_category();
        let gym = desk.finance.state().category("Gym").unwrap().id.clone();

        desk.category_input(TableInput::StartEdit(gym.clone()));
        desk.category_input(TableInput::Change {
            key: "name".into(),
            raw: "food".into(),
        });
        desk.category_input(TableInput::Key(TableKey::Enter));

        assert_eq!(desk.category_table.editor.editing_id(), Some(gym.as_str()));
        let form = desk.category_table.editor.edit_form().unwrap();
        assert_eq!(form.draft().name, "food");
        assert!(desk.finance.state().category("Gym").is_some());
        let toasts: Vec<_> = desk.notifications.visible(Instant::now()).collect();
        assert_eq!(toasts.last().unwrap().kind, NotificationKind::Error);
        assert!(toasts.last().unwrap().message.contains("already exists"));

        desk.category_input(TableInput::Change {
            key: "name".into(),
            raw: "Fitness".into(),
        });
        desk.category_input(TableInput::Key(TableKey::Enter));
        assert!(desk.category_table.editor.editing_id().is_none());
        assert!(desk.finance.state().category("Fitness").is_some());
        assert!(desk.finance.state().category("Gym").is_none());
    }

    #[test]
    fn bad_draft_input_is_reported_not_dispatched() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        desk.drafts.tx_description = "Lunch".into();
        desk.drafts.tx_amount = "twelve".into();
        desk.add_transaction();
        assert!(desk.finance.state().transactions.is_empty());
        assert_eq!(desk.notifications.len(), 1);
        assert_eq!(desk.drafts.tx_description, "Lunch");

        desk.drafts.tx_amount = "12.5".into();
        desk.add_transaction();
        let tx = &desk.finance.state().transactions[0];
        assert_eq!(tx.date, day(2024, 3, 15));
        assert_eq!(tx.amount, 12.5);
    }

    #[test]
    fn tree_modal_stays_open_on_duplicate_and_closes_on_success() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        for name in ["readme", "readme"] {
            desk.tree_event(TreeEvent::OpenCreate {
                parent: None,
                folder: false,
            });
            desk.tree_event(TreeEvent::Input(name.into()));
            desk.tree_event(TreeEvent::Submit);
        }
        assert!(desk.tree_view.modal().is_open());
        assert_eq!(
            desk.tree_view.modal().error(),
            Some("\"readme.md\" already exists")
        );
        desk.tree_event(TreeEvent::Dismiss);

        desk.tree_event(TreeEvent::ClickFile("readme.md".into()));
        assert_eq!(desk.notes.state().tree.selected(), Some("readme.md"));
        desk.tree_event(TreeEvent::Deselect);
        assert!(desk.notes.state().tree.selected().is_none());
        desk.tree_event(TreeEvent::ClickFile("readme.md".into()));
        desk.update_note("readme.md", "# Hi".into());
        desk.delete_note("readme.md");
        assert!(desk.notes.state().tree.selected().is_none());
    }

    #[test]
    fn save_failures_toast_once_per_streak() {
        struct Broken;
        impl KeyValueStore for Broken {
            fn read_raw(
                &self,
                _key: &StorageKey,
            ) -> Result<Option<String>, minidesk_storage::StorageError> {
                Ok(None)
            }
            fn write_raw(
                &self,
                key: &StorageKey,
                _payload: &str,
            ) -> Result<(), minidesk_storage::StorageError> {
                Err(minidesk_storage::StorageError::Write {
                    key: key.clone(),
                    path: "broken".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                })
            }
            fn remove(&self, _key: &StorageKey) -> Result<bool, minidesk_storage::StorageError> {
                Ok(false)
            }
            fn keys(&self) -> Result<Vec<StorageKey>, minidesk_storage::StorageError> {
                Ok(Vec::new())
            }
        }

        let mut desk = Desk::new(Arc::new(Broken), &Preferences::default(), day(2024, 3, 15));
        desk.drafts.todo_title = "Call mum".into();
        desk.add_todo();
        let start = Instant::now();
        let step = desk.save_debounce() + Duration::from_millis(1);
        desk.tick(start);
        desk.tick(start + step);
        desk.tick(start + step * 2 + step);
        assert_eq!(desk.notifications.len(), 1);
        assert!(desk.has_unsaved_changes());
    }

    #[test]
    fn calendar_month_navigation() {
        let mut desk = desk_with(Arc::new(MemoryStore::new()));
        assert_eq!(desk.calendar_month, day(2024, 3, 1));
        desk.shift_month(-3);
        assert_eq!(desk.calendar_month, day(2023, 12, 1));
        desk.shift_month(1);
        assert_eq!(desk.calendar_month.year(), 2024);
    }
}
