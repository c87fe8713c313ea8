//! Long-to-wide projection of entries into an editable grid.
//!
//! # Invariants
//! - Rows follow first-seen project order of the filtered input.
//! - Every row is dense over the requested week window.
//! - Duplicate entries are summed, never rejected.

use crate::model::entry::{Entry, EntryStatus};
use crate::model::grid::{Grid, GridRow, GridScope, RowId};
use log::debug;
use std::collections::HashMap;

/// Projects `entries` for one employee and status onto `weeks`.
///
/// Entries for weeks outside the window still create their project row,
/// so rows never disappear just because the window moved.
pub fn project(entries: &[Entry], employee: &str, status: EntryStatus, weeks: &[String]) -> Grid {
    let mut grid = Grid::empty(GridScope::new(employee, status, weeks));

    let mut columns: HashMap<&str, usize> = HashMap::with_capacity(weeks.len());
    for (index, week) in weeks.iter().enumerate() {
        columns.entry(week.as_str()).or_insert(index);
    }

    let mut row_of: HashMap<&str, usize> = HashMap::new();
    let mut matched = 0usize;
    for entry in entries.iter().filter(|entry| entry.matches(employee, status)) {
        matched += 1;
        let row_index = *row_of.entry(entry.project.as_str()).or_insert_with(|| {
            grid.rows.push(GridRow {
                row_id: RowId(grid.rows.len() as u32),
                project: entry.project.clone(),
                cells: vec![0.0; weeks.len()],
            });
            grid.rows.len() - 1
        });
        if let Some(&column) = columns.get(entry.week.as_str()) {
            grid.rows[row_index].cells[column] += entry.hours;
        }
    }

    debug!(
        "event=project module=grid status=ok matched_entries={} rows={} weeks={}",
        matched,
        grid.rows.len(),
        weeks.len()
    );
    grid
}

#[cfg(test)]
mod tests {
    use super::project;
    use crate::model::entry::{Entry, EntryStatus};

    fn weeks(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn rows_keep_first_seen_order_not_alphabetical() {
        let entries = vec![
            Entry::new("E1", "Zulu", "01-Jan", 1.0, EntryStatus::Confirmed),
            Entry::new("E1", "Alpha", "01-Jan", 2.0, EntryStatus::Confirmed),
            Entry::new("E1", "Zulu", "08-Jan", 3.0, EntryStatus::Confirmed),
        ];

        let grid = project(&entries, "E1", EntryStatus::Confirmed, &weeks(&["01-Jan", "08-Jan"]));
        assert_eq!(grid.projects(), vec!["Zulu", "Alpha"]);
        assert_eq!(grid.rows[0].cells, vec![1.0, 3.0]);
        assert_eq!(grid.rows[1].cells, vec![2.0, 0.0]);
    }

    #[test]
    fn out_of_window_entries_keep_their_row() {
        let entries = vec![Entry::new("E1", "Acme", "29-Jan", 6.0, EntryStatus::Leave)];

        let grid = project(&entries, "E1", EntryStatus::Leave, &weeks(&["01-Jan"]));
        assert_eq!(grid.projects(), vec!["Acme"]);
        assert_eq!(grid.rows[0].cells, vec![0.0]);
    }
}
