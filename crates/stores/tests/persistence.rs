use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use minidesk_storage::{FileStore, KeyValueStore, KeyValueStoreExt, SharedStore};
use minidesk_stores::{
    FinanceAction, FinanceState, NotesAction, NotesState, Reducer, StoreEvent, StoreHost,
    TodoAction, TodoState, TransactionKind, WriteThrough,
};
use tempfile::tempdir;

fn wait_for<R: Reducer>(host: &mut StoreHost<R>) -> Option<StoreEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while host.is_hydrating() && Instant::now() < deadline {
        if let Some(event) = host.poll_hydration() {
            return Some(event);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn notes_survive_a_restart() {
    let dir = tempdir().unwrap();
    let store: SharedStore = Arc::new(FileStore::new(dir.path()));

    let mut host = StoreHost::<NotesState>::default();
    host.dispatch(NotesAction::Create {
        path: "todo/groceries".into(),
        content: "- milk".into(),
    });
    host.dispatch(NotesAction::Select("todo/groceries.md".into()));
    let mut writer = WriteThrough::new(Duration::ZERO);
    assert!(writer.tick(&host, &*store, Instant::now()).unwrap());

    let mut restarted = StoreHost::<NotesState>::default();
    assert!(restarted.begin_hydration(&store));
    assert_eq!(wait_for(&mut restarted), Some(StoreEvent::Hydrated));
    let tree = &restarted.state().tree;
    assert_eq!(tree.selected(), Some("todo/groceries.md"));
    assert_eq!(
        tree.get("todo/groceries.md").and_then(|node| node.content()),
        Some("- milk")
    );
    assert_eq!(restarted.revision(), 0);
}

#[test]
fn missing_data_keeps_defaults() {
    let dir = tempdir().unwrap();
    let store: SharedStore = Arc::new(FileStore::new(dir.path()));
    let mut host = StoreHost::<FinanceState>::default();
    host.begin_hydration(&store);
    assert_eq!(wait_for(&mut host), None);
    assert!(!host.is_hydrating());
    assert_eq!(host.state(), &FinanceState::default());
    assert!(!host.begin_hydration(&store));
}

#[test]
fn corrupt_tree_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let file_store = FileStore::new(dir.path());
    fs::write(
        file_store.path_for(&NotesState::KEY),
        r#"{"tree":{"nodes":{"a.md":{"path":"a.md","full_path":"a.md","type":"file","content":""}}}}"#,
    )
    .unwrap();
    assert!(file_store.try_get::<NotesState>(&NotesState::KEY).is_err());

    let store: SharedStore = Arc::new(file_store);
    let mut host = StoreHost::<NotesState>::default();
    host.begin_hydration(&store);
    assert_eq!(wait_for(&mut host), None);
    assert!(host.state().tree.is_empty());
}

#[test]
fn finance_round_trips_through_json() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let mut host = StoreHost::<FinanceState>::default();
    host.dispatch(FinanceAction::AddTransaction {
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        description: "Pay".into(),
        category: "Salary".into(),
        amount: 2500.0,
        kind: TransactionKind::Income,
    });
    host.save(&store).unwrap();

    let raw = store.read_raw(&FinanceState::KEY).unwrap().unwrap();
    assert!(raw.contains("\"kind\": \"income\""));
    assert!(!raw.contains("loaded"));

    let mut restored = StoreHost::<FinanceState>::default();
    restored.hydrate_from(store.try_get(&FinanceState::KEY).unwrap());
    assert_eq!(restored.state().transactions, host.state().transactions);
    assert!(restored.state().category("Salary").unwrap().protected);
}

#[test]
fn failed_writes_are_retried() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();
    let broken = FileStore::new(&blocker);

    let mut host = StoreHost::<TodoState>::default();
    host.dispatch(TodoAction::Add {
        title: "write me".into(),
        due: None,
        priority: 2,
    });
    let mut writer = WriteThrough::new(Duration::ZERO);
    let now = Instant::now();
    assert!(writer.tick(&host, &broken, now).is_err());
    assert!(writer.is_dirty(&host));

    let working = FileStore::new(dir.path().join("data"));
    assert!(writer.tick(&host, &working, now).unwrap());
    assert!(!writer.is_dirty(&host));
}
