use resplan_core::{project, Entry, EntryStatus, RowId};

fn weeks(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

#[test]
fn single_entry_projects_to_dense_row() {
    let entries = vec![Entry::new("E1", "Acme", "01-Jan", 8.0, EntryStatus::Confirmed)];

    let grid = project(
        &entries,
        "E1",
        EntryStatus::Confirmed,
        &weeks(&["01-Jan", "08-Jan"]),
    );

    assert_eq!(grid.column_names(), vec!["Project", "01-Jan", "08-Jan"]);
    assert_eq!(grid.rows.len(), 1);
    assert_eq!(grid.rows[0].row_id, RowId(0));
    assert_eq!(grid.rows[0].project, "Acme");
    assert_eq!(grid.rows[0].cells, vec![8.0, 0.0]);
}

#[test]
fn other_employees_and_statuses_are_filtered_out() {
    let entries = vec![
        Entry::new("E1", "Acme", "01-Jan", 8.0, EntryStatus::Confirmed),
        Entry::new("E1", "Acme", "01-Jan", 2.0, EntryStatus::Tentative),
        Entry::new("E2", "Acme", "01-Jan", 5.0, EntryStatus::Confirmed),
        Entry::new("E1", "Sales", "08-Jan", 4.0, EntryStatus::Bd),
    ];

    let grid = project(&entries, "E1", EntryStatus::Tentative, &weeks(&["01-Jan"]));
    assert_eq!(grid.projects(), vec!["Acme"]);
    assert_eq!(grid.cell(RowId(0), "01-Jan"), Some(2.0));

    let bd = project(&entries, "E1", EntryStatus::Bd, &weeks(&["01-Jan", "08-Jan"]));
    assert_eq!(bd.projects(), vec!["Sales"]);
    assert_eq!(bd.rows[0].cells, vec![0.0, 4.0]);
}

#[test]
fn no_matching_entries_yield_empty_grid_with_columns() {
    let entries = vec![Entry::new("E2", "Acme", "01-Jan", 8.0, EntryStatus::Confirmed)];

    let grid = project(
        &entries,
        "E1",
        EntryStatus::Confirmed,
        &weeks(&["01-Jan", "08-Jan"]),
    );
    assert!(grid.is_empty());
    assert_eq!(grid.column_names(), vec!["Project", "01-Jan", "08-Jan"]);
}

#[test]
fn projects_outside_window_keep_an_empty_row() {
    let entries = vec![
        Entry::new("E1", "Acme", "01-Jan", 8.0, EntryStatus::Confirmed),
        Entry::new("E1", "Legacy", "04-Dec", 6.0, EntryStatus::Confirmed),
    ];

    let grid = project(&entries, "E1", EntryStatus::Confirmed, &weeks(&["01-Jan"]));
    assert_eq!(grid.projects(), vec!["Acme", "Legacy"]);
    assert_eq!(grid.rows[1].cells, vec![0.0]);
}

#[test]
fn each_projection_gets_a_fresh_snapshot_id() {
    let entries = vec![Entry::new("E1", "Acme", "01-Jan", 8.0, EntryStatus::Confirmed)];
    let window = weeks(&["01-Jan"]);

    let first = project(&entries, "E1", EntryStatus::Confirmed, &window);
    let second = project(&entries, "E1", EntryStatus::Confirmed, &window);
    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(first.rows, second.rows);
}
