use resplan_core::db::open_db_in_memory;
use resplan_core::repo::tables::{entries_from_table, entries_to_table, ENTRY_COLUMNS};
use resplan_core::{
    Entry, EntryStatus, RecordStore, RecordTable, RepoError, SqliteRecordStore, StoreTable,
};
use rusqlite::Connection;

fn cell(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[test]
fn missing_table_loads_empty_with_requested_columns() {
    let conn = Connection::open_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let table = store.load(&ENTRY_COLUMNS).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.columns(), ENTRY_COLUMNS);
    assert_eq!(store.revision().unwrap(), 0);
}

#[test]
fn missing_columns_are_synthesized_as_null() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE entries (Employee TEXT, Project TEXT, Week TEXT, Hours REAL);
         INSERT INTO entries VALUES ('E1', 'Alpha', '01-Jan', 8.0);",
    )
    .unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let table = store.load(&ENTRY_COLUMNS).unwrap();
    assert_eq!(table.columns(), ENTRY_COLUMNS);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "Project"), Some("Alpha"));
    assert_eq!(table.get(0, "Hours"), Some("8"));
    assert_eq!(table.get(0, "Status"), None);

    // A row without status cannot be placed in any grid.
    assert!(entries_from_table(&table).unwrap().is_empty());
}

#[test]
fn save_adds_missing_columns_to_legacy_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE entries (Employee TEXT, Project TEXT);")
        .unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let entries = vec![Entry::new("E1", "Alpha", "01-Jan", 7.5, EntryStatus::Tentative)];
    let revision = store.save(&entries_to_table(&entries).unwrap()).unwrap();
    assert_eq!(revision, 1);

    let loaded = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(loaded, entries);
}

#[test]
fn save_replaces_whole_table_and_bumps_revision() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let first = vec![
        Entry::new("E1", "Alpha", "01-Jan", 8.0, EntryStatus::Confirmed),
        Entry::new("E1", "Beta", "01-Jan", 4.0, EntryStatus::Confirmed),
    ];
    assert_eq!(store.save(&entries_to_table(&first).unwrap()).unwrap(), 1);

    let second = vec![Entry::new("E2", "Gamma", "08-Jan", 2.0, EntryStatus::Leave)];
    assert_eq!(store.save(&entries_to_table(&second).unwrap()).unwrap(), 2);

    let loaded = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(loaded, second);
    assert_eq!(store.revision().unwrap(), 2);
}

#[test]
fn stale_revision_is_rejected_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);
    let original = vec![Entry::new("E1", "Alpha", "01-Jan", 8.0, EntryStatus::Confirmed)];
    store.save(&entries_to_table(&original).unwrap()).unwrap();

    let replacement = entries_to_table(&[]).unwrap();
    let err = store.save_if_revision(&replacement, 0).unwrap_err();
    match err {
        RepoError::StaleRevision { expected, actual } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    let loaded = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(loaded, original);
    assert_eq!(store.save_if_revision(&replacement, 1).unwrap(), 2);
}

#[test]
fn revisions_are_tracked_per_table() {
    let conn = open_db_in_memory().unwrap();
    let entries = SqliteRecordStore::new(&conn, StoreTable::Entries);
    let employees = SqliteRecordStore::new(&conn, StoreTable::Employees);

    let mut roster = RecordTable::empty(&["Employee"]);
    roster.push_row(vec![cell("E1")]).unwrap();
    employees.save(&roster).unwrap();

    assert_eq!(employees.revision().unwrap(), 1);
    assert_eq!(entries.revision().unwrap(), 0);
}

#[test]
fn unparseable_hours_are_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO entries (Employee, Project, Week, Hours, Status)
         VALUES ('E1', 'Alpha', '01-Jan', 'lots', 'Confirmed');",
        [],
    )
    .unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let table = store.load(&ENTRY_COLUMNS).unwrap();
    let err = entries_from_table(&table).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn duplicate_rows_are_summed_on_load() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO entries (Employee, Project, Week, Hours, Status) VALUES
            ('E1', 'Alpha', '01-Jan', 3.0, 'Confirmed'),
            ('E1', 'Alpha', '01-Jan', 2.0, 'Confirmed'),
            ('E1', 'Alpha', '01-Jan', 1.0, 'Tentative');",
    )
    .unwrap();
    let store = SqliteRecordStore::new(&conn, StoreTable::Entries);

    let entries = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(
        entries,
        vec![
            Entry::new("E1", "Alpha", "01-Jan", 5.0, EntryStatus::Confirmed),
            Entry::new("E1", "Alpha", "01-Jan", 1.0, EntryStatus::Tentative),
        ]
    );
}
