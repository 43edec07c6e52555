//! Per-feature state containers, their hydration from the persistence adapter and the
//! write-through that saves them back.
//! 各功能的狀態容器、從持久化介面載入的流程，以及寫回儲存的機制。

mod rows;

pub mod calendar;
pub mod expenses;
pub mod finance;
pub mod host;
pub mod notes;
pub mod notify;
pub mod reducer;
pub mod shopping;
pub mod todo;
pub mod write_through;

pub use calendar::{CalendarAction, CalendarEvent, CalendarState, MonthDay};
pub use expenses::{ExpenseAction, ExpensesState, RecurringExpense};
pub use finance::{
    Category, CategoryTotal, FinanceAction, FinanceState, Summary, Transaction, TransactionKind,
};
pub use host::StoreHost;
pub use notes::{NotesAction, NotesState};
pub use notify::{Notification, NotificationKind, Notifications};
pub use reducer::{command_action, Reducer, StoreError, StoreEvent};
pub use shopping::{ShoppingAction, ShoppingItem, ShoppingState};
pub use todo::{TodoAction, TodoItem, TodoState};
pub use write_through::WriteThrough;
