//! Edit set describing one grid editing interaction.
//!
//! # Responsibility
//! - Carry exactly the deltas a user made against one grid snapshot.
//! - Keep raw cell input untyped until reconciliation validates it.
//!
//! # Invariants
//! - Rows are addressed by `RowId`, never by project name.
//! - When `snapshot_id` is set it names the grid the edits were made on.

use crate::model::grid::{RowId, SnapshotId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw cell input as produced by a grid editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    /// Free text typed by the user; parsed during reconciliation.
    Text(String),
    /// Cleared cell.
    Empty,
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One changed cell of an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub row_id: RowId,
    pub week: String,
    pub value: CellValue,
}

/// One row appended by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddedRow {
    /// Row identifier; rows without one are skipped on reconcile.
    #[serde(default)]
    pub project: Option<String>,
    /// Week label -> cell input. Weeks not listed are empty.
    #[serde(default)]
    pub values: BTreeMap<String, CellValue>,
}

impl AddedRow {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, week: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(week.into(), value.into());
        self
    }
}

/// Rename of an existing row's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRename {
    pub row_id: RowId,
    pub project: String,
}

/// Deltas produced by one editing interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSet {
    pub snapshot_id: Option<SnapshotId>,
    /// Later edits of the same cell win.
    pub edited_cells: Vec<CellEdit>,
    pub added_rows: Vec<AddedRow>,
    pub deleted_rows: BTreeSet<RowId>,
    pub renamed_rows: Vec<RowRename>,
}

impl EditSet {
    /// Creates an empty edit set bound to one grid snapshot.
    pub fn for_snapshot(snapshot_id: SnapshotId) -> Self {
        Self {
            snapshot_id: Some(snapshot_id),
            ..Self::default()
        }
    }

    /// Returns whether the edit set carries no deltas at all.
    pub fn is_empty(&self) -> bool {
        self.edited_cells.is_empty()
            && self.added_rows.is_empty()
            && self.deleted_rows.is_empty()
            && self.renamed_rows.is_empty()
    }

    pub fn edit_cell(
        mut self,
        row_id: RowId,
        week: impl Into<String>,
        value: impl Into<CellValue>,
    ) -> Self {
        self.edited_cells.push(CellEdit {
            row_id,
            week: week.into(),
            value: value.into(),
        });
        self
    }

    pub fn clear_cell(mut self, row_id: RowId, week: impl Into<String>) -> Self {
        self.edited_cells.push(CellEdit {
            row_id,
            week: week.into(),
            value: CellValue::Empty,
        });
        self
    }

    pub fn add_row(mut self, row: AddedRow) -> Self {
        self.added_rows.push(row);
        self
    }

    pub fn delete_row(mut self, row_id: RowId) -> Self {
        self.deleted_rows.insert(row_id);
        self
    }

    pub fn rename_row(mut self, row_id: RowId, project: impl Into<String>) -> Self {
        self.renamed_rows.push(RowRename {
            row_id,
            project: project.into(),
        });
        self
    }
}
