//! Wide editable grid projected from flat entries.
//!
//! # Responsibility
//! - Hold one dense `(project x week)` snapshot for one employee and status.
//! - Give every row a surrogate `RowId` so edits never rely on row names.
//!
//! # Invariants
//! - `rows[i].row_id == RowId(i)` for a freshly projected grid.
//! - Every row has exactly `scope.weeks.len()` cells.
//! - Absent cells are `0.0`, never missing.

use crate::model::entry::{EmployeeId, EntryStatus};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Column label of the row identifier column.
pub const PROJECT_COLUMN: &str = "Project";

/// Identifier of one grid snapshot.
pub type SnapshotId = Uuid;

/// Surrogate row key: index into the snapshot's row arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u32);

impl RowId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The `(employee, status, weeks)` triple a grid is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridScope {
    pub employee: EmployeeId,
    pub status: EntryStatus,
    /// Visible week window in caller order.
    pub weeks: Vec<String>,
}

impl GridScope {
    pub fn new(employee: impl Into<String>, status: EntryStatus, weeks: &[String]) -> Self {
        Self {
            employee: employee.into(),
            status,
            weeks: weeks.to_vec(),
        }
    }

    /// Returns the column index of `week`, if it is inside the window.
    pub fn week_index(&self, week: &str) -> Option<usize> {
        self.weeks.iter().position(|candidate| candidate == week)
    }

    pub fn contains_week(&self, week: &str) -> bool {
        self.week_index(week).is_some()
    }
}

/// One grid row: a project identifier plus one cell per week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub row_id: RowId,
    pub project: String,
    pub cells: Vec<f64>,
}

/// Dense projection of one employee's entries for one status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub snapshot_id: SnapshotId,
    pub scope: GridScope,
    pub rows: Vec<GridRow>,
}

impl Grid {
    /// Creates a zero-row grid with a fresh snapshot id.
    pub fn empty(scope: GridScope) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            scope,
            rows: Vec::new(),
        }
    }

    /// Returns `["Project", weeks...]`.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(PROJECT_COLUMN.to_string())
            .chain(self.scope.weeks.iter().cloned())
            .collect()
    }

    pub fn weeks(&self) -> &[String] {
        &self.scope.weeks
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row_id: RowId) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.row_id == row_id)
    }

    /// Returns the cell value for `(row_id, week)`.
    ///
    /// `None` when the row or week is not part of this grid.
    pub fn cell(&self, row_id: RowId, week: &str) -> Option<f64> {
        let column = self.scope.week_index(week)?;
        self.row(row_id).and_then(|row| row.cells.get(column).copied())
    }

    /// Returns the project identifiers in row order.
    pub fn projects(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.project.as_str()).collect()
    }
}
