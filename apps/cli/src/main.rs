use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use minidesk_filetree::FileTree;
use minidesk_settings::{
    resolve_data_dir, FinancePreferences, PreferencesStore, ViewMode, PREFERENCES_FILE,
};
use minidesk_storage::{FileStore, KeyValueStoreExt};
use minidesk_stores::{
    CalendarAction, CalendarEvent, CalendarState, ExpenseAction, ExpensesState, FinanceAction,
    FinanceState, NotesAction, NotesState, Reducer, ShoppingAction, ShoppingState, StoreEvent,
    StoreHost, TodoAction, TodoState, TransactionKind,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Characters of a row id shown in listings; any unique prefix is accepted as input.
const SHORT_ID: usize = 8;

#[derive(Parser)]
#[command(
    name = "minidesk",
    about = "Scripting access to MiniDesk notes, lists, finances and calendar",
    author,
    version
)]
struct Cli {
    /// 資料目錄；預設為 $MINIDESK_DATA_DIR 或 ./.minidesk。 / Data directory (defaults to $MINIDESK_DATA_DIR or ./.minidesk).
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 管理 Markdown 筆記樹。 / Manage the markdown note tree.
    #[command(subcommand)]
    Notes(NotesCommand),
    /// 待辦清單。 / Todo list.
    #[command(subcommand)]
    Todo(TodoCommand),
    /// 購物清單。 / Shopping list.
    #[command(subcommand)]
    Shopping(ShoppingCommand),
    /// 收支紀錄。 / Income and expense tracking.
    #[command(subcommand)]
    Finance(FinanceCommand),
    /// 每月固定支出。 / Recurring monthly expenses.
    #[command(subcommand)]
    Expenses(ExpensesCommand),
    /// 行事曆。 / Calendar events.
    #[command(subcommand)]
    Calendar(CalendarCommand),
    /// 偏好設定。 / Preferences.
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Subcommand)]
enum NotesCommand {
    /// 建立檔案（自動補上 .md 與上層資料夾）。 / Create a file, adding `.md` and parent folders as needed.
    Create {
        #[arg(value_name = "PATH")]
        path: String,
        /// 初始內容。 / Initial markdown content.
        #[arg(long, default_value = "")]
        content: String,
    },
    /// 建立資料夾。 / Create a folder.
    Mkdir {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// 重新命名檔案或資料夾。 / Rename a file or folder.
    Rename {
        #[arg(value_name = "PATH")]
        target: String,
        #[arg(value_name = "NEW_NAME")]
        new_name: String,
    },
    /// 刪除檔案或整個資料夾。 / Delete a file or a whole folder.
    Delete {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// 選取檔案；`--clear` 取消選取。 / Select a file, or clear the selection with `--clear`.
    Select {
        #[arg(value_name = "PATH", required_unless_present = "clear")]
        path: Option<String>,
        #[arg(long, conflicts_with = "path")]
        clear: bool,
    },
    /// 顯示檔案內容；預設為目前選取的檔案。 / Print a file; defaults to the selected one.
    Show {
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
    /// 列出整棵文件樹。 / Print the whole tree.
    Tree,
}

#[derive(Subcommand)]
enum TodoCommand {
    /// 新增待辦事項。 / Add an item.
    Add {
        title: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        due: Option<NaiveDate>,
        #[arg(long, default_value_t = 3)]
        priority: u8,
    },
    /// 切換完成狀態。 / Toggle an item's done flag.
    Done { id: String },
    /// 移除待辦事項。 / Remove an item.
    Remove { id: String },
    /// 列出待辦事項。 / List items.
    List {
        /// 包含已完成項目。 / Include completed items.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ShoppingCommand {
    /// 新增購物項目。 / Add an item.
    Add {
        name: String,
        #[arg(long, default_value_t = 1.0)]
        quantity: f64,
        #[arg(long, default_value = "")]
        unit: String,
    },
    /// 切換已購買狀態。 / Toggle an item's bought flag.
    Bought { id: String },
    /// 移除購物項目。 / Remove an item.
    Remove { id: String },
    /// 列出購物清單。 / List items.
    List,
}

#[derive(Args)]
struct WindowArgs {
    /// 統計範圍。 / Reporting window.
    #[arg(long, value_enum)]
    view: Option<ViewArg>,
    /// 範圍基準日；預設為今天。 / Date the window is anchored at; defaults to today.
    #[arg(long, value_name = "YYYY-MM-DD")]
    anchor: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewArg {
    Month,
    Year,
    All,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Month => ViewMode::Month,
            ViewArg::Year => ViewMode::Year,
            ViewArg::All => ViewMode::All,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
        }
    }
}

#[derive(Subcommand)]
enum FinanceCommand {
    /// 新增一筆收支。 / Record a transaction.
    Add {
        amount: f64,
        description: String,
        #[arg(long, value_enum, default_value_t = KindArg::Expense)]
        kind: KindArg,
        #[arg(long, default_value = "Other")]
        category: String,
        /// 預設為今天。 / Defaults to today.
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// 列出範圍內的收支。 / List transactions inside a window.
    List(WindowArgs),
    /// 顯示收入、支出與結餘。 / Print income, expense and balance.
    Summary(WindowArgs),
}

#[derive(Subcommand)]
enum ExpensesCommand {
    /// 新增每月固定支出。 / Add a recurring expense.
    Add {
        name: String,
        amount: f64,
        #[arg(long, value_name = "DAY", default_value_t = 1)]
        due_day: u8,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// 移除固定支出。 / Remove a recurring expense.
    Remove { id: String },
    /// 列出固定支出與每月總額。 / List recurring expenses and the monthly total.
    List,
}

#[derive(Subcommand)]
enum CalendarCommand {
    /// 新增行程。 / Add an event.
    Add {
        title: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: NaiveDate,
        #[arg(long, value_name = "HH:MM", value_parser = parse_time)]
        time: Option<NaiveTime>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// 列出即將到來的行程。 / List upcoming events.
    List {
        /// 預設為今天。 / Defaults to today.
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// 顯示目前偏好設定。 / Print the current preferences.
    Show,
    /// 設定財務頁面的貨幣代碼。 / Set the finance currency code.
    SetCurrency {
        #[arg(value_name = "CODE")]
        code: String,
    },
    /// 匯出偏好設定。 / Export preferences to a file.
    Export {
        #[arg(value_name = "FILE")]
        output: PathBuf,
    },
}

fn parse_time(raw: &str) -> std::result::Result<NaiveTime, String> {
    match CalendarEvent::parse_time(raw) {
        Ok(Some(time)) => Ok(time),
        Ok(None) => Err("time cannot be empty".to_string()),
        Err(_) => Err(format!("{raw:?} is not a time like 14:30")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minidesk=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli { data_dir, command } = Cli::parse();
    let cwd = std::env::current_dir().context("determine current directory")?;
    let data_dir = resolve_data_dir(data_dir.as_deref(), &cwd);
    debug!(data_dir = %data_dir.display(), "resolved data directory");
    let store = FileStore::new(&data_dir);
    match command {
        Commands::Notes(command) => execute_notes(command, &store),
        Commands::Todo(command) => execute_todo(command, &store),
        Commands::Shopping(command) => execute_shopping(command, &store),
        Commands::Finance(command) => execute_finance(command, &store, &data_dir),
        Commands::Expenses(command) => execute_expenses(command, &store, &data_dir),
        Commands::Calendar(command) => execute_calendar(command, &store),
        Commands::Prefs(command) => execute_prefs(command, &data_dir),
    }
}

/// Loads a feature store; a corrupt file is an error here rather than a silent reset.
fn load<R: Reducer>(store: &FileStore) -> Result<StoreHost<R>> {
    let persisted = store
        .try_get::<R>(&R::KEY)
        .with_context(|| format!("load {}", R::KEY))?;
    let mut host = StoreHost::default();
    host.hydrate_from(persisted);
    Ok(host)
}

/// Dispatches `action` and writes the store back when it changed.
fn commit<R: Reducer>(
    host: &mut StoreHost<R>,
    store: &FileStore,
    action: R::Action,
) -> Result<StoreEvent> {
    let event = match host.dispatch(action) {
        StoreEvent::Refused(error) => return Err(error.into()),
        event => event,
    };
    if event.is_change() {
        host.save(store)
            .with_context(|| format!("save {}", R::KEY))?;
    }
    Ok(event)
}

/// Resolves a full row id from a unique prefix.
fn resolve_id<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    what: &str,
) -> Result<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        bail!("{what} id cannot be empty");
    }
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => bail!("no {what} matches id {prefix:?}"),
        _ => bail!("id {prefix:?} matches {} {what} entries", matches.len()),
    }
}

fn short(id: &str) -> &str {
    id.get(..SHORT_ID).unwrap_or(id)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn preferences(data_dir: &Path) -> PreferencesStore {
    PreferencesStore::load_or_default(data_dir.join(PREFERENCES_FILE))
}

fn execute_notes(command: NotesCommand, store: &FileStore) -> Result<()> {
    let mut host = load::<NotesState>(store)?;
    match command {
        NotesCommand::Create { path, content } => {
            let event = commit(&mut host, store, NotesAction::Create { path, content })?;
            report_tree_change("Created", &event);
        }
        NotesCommand::Mkdir { path } => {
            let event = commit(&mut host, store, NotesAction::CreateFolder(path))?;
            report_tree_change("Created", &event);
        }
        NotesCommand::Rename { target, new_name } => {
            if host.state().tree.get(&target).is_none() {
                bail!("no note or folder at {target:?}");
            }
            let event = commit(&mut host, store, NotesAction::Rename { target, new_name })?;
            match event {
                StoreEvent::TreeChanged(diff) => {
                    if let Some((old, new)) = diff.renamed.first() {
                        println!("Renamed {old} -> {new}");
                    }
                }
                _ => println!("Nothing to rename"),
            }
        }
        NotesCommand::Delete { path } => {
            let event = commit(&mut host, store, NotesAction::Delete(path.clone()))?;
            match event {
                StoreEvent::TreeChanged(diff) => {
                    println!("Deleted {} entr{}", diff.removed.len(), plural_y(diff.removed.len()))
                }
                _ => println!("Nothing at {path}"),
            }
        }
        NotesCommand::Select { path: None, .. } => {
            match commit(&mut host, store, NotesAction::ClearSelection)? {
                StoreEvent::Unchanged => println!("Nothing selected"),
                _ => println!("Selection cleared"),
            }
        }
        NotesCommand::Select {
            path: Some(path), ..
        } => {
            let is_file = host.state().tree.get(&path).is_some_and(|node| node.is_file());
            if !is_file {
                bail!("no note at {path:?}");
            }
            commit(&mut host, store, NotesAction::Select(path.clone()))?;
            println!("Selected {path}");
        }
        NotesCommand::Show { path } => {
            let tree = &host.state().tree;
            let node = match path {
                Some(path) => tree.get(&path),
                None => tree.selected_node(),
            };
            match node.and_then(|node| node.content()) {
                Some(content) => println!("{content}"),
                None => bail!("no note to show"),
            }
        }
        NotesCommand::Tree => print_tree(&host.state().tree, "", 0),
    }
    Ok(())
}

fn report_tree_change(verb: &str, event: &StoreEvent) {
    if let StoreEvent::TreeChanged(diff) = event {
        for path in &diff.added {
            println!("{verb} {path}");
        }
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

fn print_tree(tree: &FileTree, path: &str, depth: usize) {
    for node in tree.children(path) {
        let marker = if tree.selected() == Some(node.full_path.as_str()) {
            " *"
        } else {
            ""
        };
        let slash = if node.is_folder() { "/" } else { "" };
        println!("{}{}{slash}{marker}", "  ".repeat(depth), node.path);
        if node.is_folder() {
            print_tree(tree, &node.full_path, depth + 1);
        }
    }
}

fn execute_todo(command: TodoCommand, store: &FileStore) -> Result<()> {
    let mut host = load::<TodoState>(store)?;
    let id_of = |host: &StoreHost<TodoState>, prefix: &str| {
        resolve_id(host.state().items.iter().map(|item| item.id.as_str()), prefix, "todo")
    };
    match command {
        TodoCommand::Add {
            title,
            due,
            priority,
        } => {
            commit(
                &mut host,
                store,
                TodoAction::Add {
                    title,
                    due,
                    priority,
                },
            )?;
            if let Some(item) = host.state().items.last() {
                println!("Added todo {} {:?}", short(&item.id), item.title);
            }
        }
        TodoCommand::Done { id } => {
            let id = id_of(&host, &id)?;
            commit(&mut host, store, TodoAction::Toggle(id.clone()))?;
            if let Some(item) = host.state().get(&id) {
                let state = if item.done { "done" } else { "open" };
                println!("Marked {:?} {state}", item.title);
            }
        }
        TodoCommand::Remove { id } => {
            let id = id_of(&host, &id)?;
            commit(&mut host, store, TodoAction::Remove(id.clone()))?;
            println!("Removed todo {}", short(&id));
        }
        TodoCommand::List { all } => {
            let items: Vec<_> = host
                .state()
                .items
                .iter()
                .filter(|item| all || !item.done)
                .collect();
            if items.is_empty() {
                println!("No todos");
            }
            for item in items {
                let check = if item.done { "x" } else { " " };
                let due = item
                    .due
                    .map(|date| format!(", due {date}"))
                    .unwrap_or_default();
                println!(
                    "{}  [{check}] {}  (p{}{due})",
                    short(&item.id),
                    item.title,
                    item.priority
                );
            }
        }
    }
    Ok(())
}

fn execute_shopping(command: ShoppingCommand, store: &FileStore) -> Result<()> {
    let mut host = load::<ShoppingState>(store)?;
    let id_of = |host: &StoreHost<ShoppingState>, prefix: &str| {
        resolve_id(host.state().items.iter().map(|item| item.id.as_str()), prefix, "shopping")
    };
    match command {
        ShoppingCommand::Add {
            name,
            quantity,
            unit,
        } => {
            commit(
                &mut host,
                store,
                ShoppingAction::Add {
                    name,
                    quantity,
                    unit,
                },
            )?;
            if let Some(item) = host.state().items.last() {
                println!("Added {} {:?}", short(&item.id), item.name);
            }
        }
        ShoppingCommand::Bought { id } => {
            let id = id_of(&host, &id)?;
            commit(&mut host, store, ShoppingAction::ToggleBought(id.clone()))?;
            if let Some(item) = host.state().get(&id) {
                let state = if item.bought { "bought" } else { "not bought" };
                println!("Marked {:?} {state}", item.name);
            }
        }
        ShoppingCommand::Remove { id } => {
            let id = id_of(&host, &id)?;
            commit(&mut host, store, ShoppingAction::Remove(id.clone()))?;
            println!("Removed {}", short(&id));
        }
        ShoppingCommand::List => {
            if host.state().items.is_empty() {
                println!("Shopping list is empty");
            }
            for item in &host.state().items {
                let check = if item.bought { "x" } else { " " };
                let quantity = format_quantity(item.quantity, &item.unit);
                println!("{}  [{check}] {}  {quantity}", short(&item.id), item.name);
            }
        }
    }
    Ok(())
}

fn format_quantity(quantity: f64, unit: &str) -> String {
    let number = if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity}")
    };
    if unit.is_empty() {
        format!("x{number}")
    } else {
        format!("{number} {unit}")
    }
}

fn window(args: &WindowArgs, data_dir: &Path) -> (ViewMode, NaiveDate) {
    let view = match args.view {
        Some(view) => view.into(),
        None => preferences(data_dir).preferences().finance.default_view,
    };
    (view, args.anchor.unwrap_or_else(today))
}

fn execute_finance(command: FinanceCommand, store: &FileStore, data_dir: &Path) -> Result<()> {
    let mut host = load::<FinanceState>(store)?;
    let currency = preferences(data_dir).preferences().finance.currency.clone();
    match command {
        FinanceCommand::Add {
            amount,
            description,
            kind,
            category,
            date,
        } => {
            commit(
                &mut host,
                store,
                FinanceAction::AddTransaction {
                    date: date.unwrap_or_else(today),
                    description,
                    category,
                    amount,
                    kind: kind.into(),
                },
            )?;
            if let Some(tx) = host.state().transactions.last() {
                println!(
                    "Recorded {} {:.2} {currency} {:?} in {}",
                    tx.kind, tx.amount, tx.description, tx.category
                );
            }
        }
        FinanceCommand::List(args) => {
            let (view, anchor) = window(&args, data_dir);
            let transactions = host.state().transactions_in(view, anchor);
            if transactions.is_empty() {
                println!("No transactions ({})", view.label());
            }
            for tx in transactions {
                println!(
                    "{}  {}  {:>10.2} {currency}  {}  [{}]",
                    short(&tx.id),
                    tx.date,
                    tx.signed_amount(),
                    tx.description,
                    tx.category
                );
            }
        }
        FinanceCommand::Summary(args) => {
            let (view, anchor) = window(&args, data_dir);
            let summary = host.state().summary(view, anchor);
            println!("{} as of {anchor}", view.label());
            println!("Income:  {:.2} {currency}", summary.income);
            println!("Expense: {:.2} {currency}", summary.expense);
            println!("Balance: {:.2} {currency}", summary.balance);
            for total in host.state().by_category(view, anchor) {
                if total.expense > 0.0 {
                    println!("  {:<12} {:.2}", total.category, total.expense);
                }
            }
        }
    }
    Ok(())
}

fn execute_expenses(command: ExpensesCommand, store: &FileStore, data_dir: &Path) -> Result<()> {
    let mut host = load::<ExpensesState>(store)?;
    match command {
        ExpensesCommand::Add {
            name,
            amount,
            due_day,
            category,
        } => {
            commit(
                &mut host,
                store,
                ExpenseAction::Add {
                    name,
                    amount,
                    due_day,
                    category,
                },
            )?;
            if let Some(item) = host.state().items.last() {
                println!("Added {} {:?} due on day {}", short(&item.id), item.name, item.due_day);
            }
        }
        ExpensesCommand::Remove { id } => {
            let ids = host.state().items.iter().map(|item| item.id.as_str());
            let id = resolve_id(ids, &id, "expense")?;
            commit(&mut host, store, ExpenseAction::Remove(id.clone()))?;
            println!("Removed {}", short(&id));
        }
        ExpensesCommand::List => {
            let currency = preferences(data_dir).preferences().finance.currency.clone();
            for item in &host.state().items {
                println!(
                    "{}  day {:>2}  {:>10.2} {currency}  {}",
                    short(&item.id),
                    item.due_day,
                    item.amount,
                    item.name
                );
            }
            println!("Monthly total: {:.2} {currency}", host.state().monthly_total());
        }
    }
    Ok(())
}

fn execute_calendar(command: CalendarCommand, store: &FileStore) -> Result<()> {
    let mut host = load::<CalendarState>(store)?;
    match command {
        CalendarCommand::Add {
            title,
            date,
            time,
            notes,
        } => {
            commit(
                &mut host,
                store,
                CalendarAction::Add {
                    title,
                    date,
                    time,
                    notes,
                },
            )?;
            if let Some(event) = host.state().events.last() {
                println!("Added {:?} on {}", event.title, event.date);
            }
        }
        CalendarCommand::List { from, limit } => {
            let from = from.unwrap_or_else(today);
            let events = host.state().upcoming(from, limit);
            if events.is_empty() {
                println!("No events from {from}");
            }
            for event in events {
                let time = event
                    .time
                    .map(|time| time.format("%H:%M").to_string())
                    .unwrap_or_else(|| "all day".to_string());
                println!("{}  {:<7}  {}", event.date, time, event.title);
            }
        }
    }
    Ok(())
}

fn execute_prefs(command: PrefsCommand, data_dir: &Path) -> Result<()> {
    let mut store = preferences(data_dir);
    match command {
        PrefsCommand::Show => {
            let payload = serde_json::to_string_pretty(store.preferences())
                .context("serialize preferences")?;
            println!("{payload}");
        }
        PrefsCommand::SetCurrency { code } => {
            let code = code.trim().to_ascii_uppercase();
            if !FinancePreferences::is_valid_currency(&code) {
                bail!("{code:?} is not a three-letter currency code");
            }
            store
                .update(|prefs| prefs.finance.currency = code.clone())
                .with_context(|| format!("save {}", store.path().display()))?;
            println!("Currency set to {code}");
        }
        PrefsCommand::Export { output } => {
            store
                .export_to(&output)
                .with_context(|| format!("export preferences to {}", output.display()))?;
            println!("Exported preferences to {}", output.display());
        }
    }
    Ok(())
}
