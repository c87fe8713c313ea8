use resplan_core::repo::tables::{entries_from_table, entries_to_table, ENTRY_COLUMNS};
use resplan_core::{Entry, EntryStatus, JsonFileRecordStore, RecordStore, RepoError};
use std::fs;

fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::new("E1", "Alpha", "01-Jan", 8.0, EntryStatus::Confirmed),
        Entry::new("E1", "Leave", "08-Jan", 16.0, EntryStatus::Leave),
    ]
}

#[test]
fn missing_file_loads_as_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileRecordStore::new(dir.path().join("entries.json"));

    let table = store.load(&ENTRY_COLUMNS).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.columns(), ENTRY_COLUMNS);
    assert_eq!(store.revision().unwrap(), 0);
}

#[test]
fn zero_length_file_loads_as_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    fs::write(&path, "").unwrap();
    let store = JsonFileRecordStore::new(&path);

    assert!(store.load(&ENTRY_COLUMNS).unwrap().is_empty());
    assert_eq!(store.revision().unwrap(), 0);
}

#[test]
fn corrupt_file_is_reported_not_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    fs::write(&path, "{ not json").unwrap();
    let store = JsonFileRecordStore::new(&path);

    let err = store.load(&ENTRY_COLUMNS).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn save_then_load_returns_saved_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileRecordStore::new(dir.path().join("entries.json"));

    let revision = store
        .save(&entries_to_table(&sample_entries()).unwrap())
        .unwrap();
    assert_eq!(revision, 1);

    let loaded = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(loaded, sample_entries());
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileRecordStore::new(dir.path().join("entries.json"));

    store
        .save(&entries_to_table(&sample_entries()).unwrap())
        .unwrap();
    store.save(&entries_to_table(&[]).unwrap()).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["entries.json".to_string()]);
    assert_eq!(store.revision().unwrap(), 2);
}

#[test]
fn stale_revision_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileRecordStore::new(dir.path().join("entries.json"));
    store
        .save(&entries_to_table(&sample_entries()).unwrap())
        .unwrap();

    let err = store
        .save_if_revision(&entries_to_table(&[]).unwrap(), 0)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::StaleRevision {
            expected: 0,
            actual: 1
        }
    ));
    let loaded = entries_from_table(&store.load(&ENTRY_COLUMNS).unwrap()).unwrap();
    assert_eq!(loaded, sample_entries());
}

#[test]
fn documents_with_fewer_columns_are_conformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    fs::write(
        &path,
        r#"{"revision": 3, "columns": ["Employee", "Project"], "rows": [["E1", "Alpha"]]}"#,
    )
    .unwrap();
    let store = JsonFileRecordStore::new(&path);

    let table = store.load(&ENTRY_COLUMNS).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "Employee"), Some("E1"));
    assert_eq!(table.get(0, "Hours"), None);
    assert_eq!(store.revision().unwrap(), 3);
}
