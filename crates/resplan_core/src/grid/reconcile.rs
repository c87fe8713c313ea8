//! Reconciliation of grid edits back into flat entries.
//!
//! # Responsibility
//! - Validate an edit set against the grid snapshot it was made on.
//! - Derive the new flat entry list under one of two merge policies.
//!
//! # Invariants
//! - Validation is all-or-nothing: any invalid cell rejects the edit set.
//! - Empty and zero cells never produce entries.
//! - Cell values are validated even on rows the same edit set deletes.
//! - Deleting a row removes its entries in every week, not only the window.
//! - Applying the same edit set twice equals applying it once.

use crate::model::edit::{CellValue, EditSet};
use crate::model::entry::{coalesce_entries, Entry};
use crate::model::grid::{Grid, GridRow, GridScope, RowId, SnapshotId};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// How edits are merged into the flat store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Replace every in-window entry of the grid scope with the edited grid.
    #[default]
    FullReplace,
    /// Overwrite or append only the cells touched by the edit set.
    ///
    /// A touched cell is written with the total of every row carrying that
    /// project name, as under `FullReplace`.
    IncrementalUpsert,
}

impl ReconcilePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullReplace => "full_replace",
            Self::IncrementalUpsert => "incremental_upsert",
        }
    }

    /// Accepts `full_replace`/`full-replace` and the upsert equivalents.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "full_replace" => Some(Self::FullReplace),
            "incremental_upsert" | "upsert" => Some(Self::IncrementalUpsert),
            _ => None,
        }
    }
}

/// Position of a row in an edit: an existing grid row or an added row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    Existing(RowId),
    /// Index into `EditSet::added_rows`.
    Added(usize),
}

impl Display for RowRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Existing(row_id) => write!(f, "row {row_id}"),
            Self::Added(index) => write!(f, "added row {index}"),
        }
    }
}

/// Reasons an edit set is rejected as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// The edit set was made against a different grid snapshot.
    SnapshotMismatch {
        expected: SnapshotId,
        actual: SnapshotId,
    },
    /// A referenced row id is not part of the snapshot.
    UnknownRow(RowId),
    /// A cell targets a week outside the grid window.
    UnknownWeek { row: RowRef, week: String },
    /// A cell value is not a finite, non-negative number.
    InvalidHoursValue {
        row: RowRef,
        week: String,
        value: String,
    },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SnapshotMismatch { expected, actual } => write!(
                f,
                "edit set targets grid snapshot {actual}, expected {expected}"
            ),
            Self::UnknownRow(row_id) => write!(f, "edit references unknown grid row {row_id}"),
            Self::UnknownWeek { row, week } => {
                write!(f, "{row} references week `{week}` outside the grid window")
            }
            Self::InvalidHoursValue { row, week, value } => write!(
                f,
                "InvalidHoursValue: {row} week `{week}` has non-numeric or negative hours `{value}`"
            ),
        }
    }
}

impl Error for ReconcileError {}

/// Non-fatal findings surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWarning {
    /// The row had no identifier after trimming and produced no entries.
    MissingIdentifier { row: RowRef },
}

/// One surviving row after edits are applied.
#[derive(Debug, Clone, PartialEq)]
struct EditedRow {
    origin: RowRef,
    /// Project name in the snapshot; `None` for added rows.
    original_project: Option<String>,
    project: String,
    cells: Vec<Option<f64>>,
}

/// Snapshot with the edit set applied and validated.
#[derive(Debug, Clone, PartialEq)]
struct EditedGrid {
    scope: GridScope,
    rows: Vec<EditedRow>,
    /// Snapshot names of deleted rows.
    deleted_projects: Vec<String>,
    /// `(project, column)` for every cell the edit set wrote, first write first.
    touched: Vec<(String, usize)>,
    warnings: Vec<ReconcileWarning>,
}

impl EditedGrid {
    /// Snapshot name -> new name, for surviving renamed rows.
    fn renames(&self) -> HashMap<&str, &str> {
        self.rows
            .iter()
            .filter_map(|row| {
                let original = row.original_project.as_deref()?;
                (original != row.project).then_some((original, row.project.as_str()))
            })
            .collect()
    }

    /// Deleted names whose entries must be purged in every week.
    ///
    /// A name still carried by a surviving row is not purged.
    fn purged_projects(&self) -> HashSet<&str> {
        let surviving: HashSet<&str> = self.rows.iter().map(|row| row.project.as_str()).collect();
        self.deleted_projects
            .iter()
            .map(String::as_str)
            .filter(|project| !surviving.contains(project))
            .collect()
    }

    fn emitted_entries(&self, row: &EditedRow) -> Vec<Entry> {
        row.cells
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| {
                cell.filter(|hours| *hours > 0.0)
                    .map(|hours| self.entry(&row.project, column, hours))
            })
            .collect()
    }

    /// Summed hours of every row named `project` in `column`.
    fn cell_total(&self, project: &str, column: usize) -> Option<f64> {
        let total: f64 = self
            .rows
            .iter()
            .filter(|row| row.project == project)
            .filter_map(|row| row.cells[column])
            .sum();
        (total > 0.0).then_some(total)
    }

    fn entry(&self, project: &str, column: usize, hours: f64) -> Entry {
        Entry::new(
            self.scope.employee.clone(),
            project,
            self.scope.weeks[column].clone(),
            hours,
            self.scope.status,
        )
    }

    fn to_grid(&self) -> Grid {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| GridRow {
                row_id: RowId(index as u32),
                project: row.project.clone(),
                cells: row.cells.iter().map(|cell| cell.unwrap_or(0.0)).collect(),
            })
            .collect();
        Grid {
            snapshot_id: Uuid::new_v4(),
            scope: self.scope.clone(),
            rows,
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Complete new flat store. Under `FullReplace` it projects back to the
    /// edited grid's row order.
    pub entries: Vec<Entry>,
    pub warnings: Vec<ReconcileWarning>,
    /// The grid as it looks after the edits, with renumbered row ids.
    pub edited_grid: Grid,
}

/// Applies `edits` made on `grid` to `prior` and returns the new flat store.
///
/// Employee, status and week window are taken from `grid.scope`.
///
/// # Errors
/// Returns the first validation failure; nothing is applied in that case.
pub fn reconcile(
    prior: &[Entry],
    grid: &Grid,
    edits: &EditSet,
    policy: ReconcilePolicy,
) -> Result<ReconcileOutcome, ReconcileError> {
    let started_at = Instant::now();
    let edited = match apply_edits(grid, edits) {
        Ok(edited) => edited,
        Err(err) => {
            warn!(
                "event=reconcile module=grid status=error policy={} error={}",
                policy.as_str(),
                err
            );
            return Err(err);
        }
    };

    let entries = match policy {
        ReconcilePolicy::FullReplace => full_replace(prior, &edited),
        ReconcilePolicy::IncrementalUpsert => incremental_upsert(prior, &edited),
    };

    info!(
        "event=reconcile module=grid status=ok policy={} rows={} entries={} warnings={} duration_ms={}",
        policy.as_str(),
        edited.rows.len(),
        entries.len(),
        edited.warnings.len(),
        started_at.elapsed().as_millis()
    );
    Ok(ReconcileOutcome {
        entries,
        edited_grid: edited.to_grid(),
        warnings: edited.warnings,
    })
}

fn apply_edits(grid: &Grid, edits: &EditSet) -> Result<EditedGrid, ReconcileError> {
    if let Some(actual) = edits.snapshot_id {
        if actual != grid.snapshot_id {
            return Err(ReconcileError::SnapshotMismatch {
                expected: grid.snapshot_id,
                actual,
            });
        }
    }

    let known: HashMap<RowId, &GridRow> = grid.rows.iter().map(|row| (row.row_id, row)).collect();
    let require_row = |row_id: RowId| {
        if known.contains_key(&row_id) {
            Ok(())
        } else {
            Err(ReconcileError::UnknownRow(row_id))
        }
    };

    for row_id in &edits.deleted_rows {
        require_row(*row_id)?;
    }

    let mut renames: HashMap<RowId, &str> = HashMap::new();
    for rename in &edits.renamed_rows {
        require_row(rename.row_id)?;
        renames.insert(rename.row_id, rename.project.as_str());
    }

    let mut cell_edits: HashMap<(RowId, usize), Option<f64>> = HashMap::new();
    let mut edit_order: Vec<(RowId, usize)> = Vec::new();
    for edit in &edits.edited_cells {
        require_row(edit.row_id)?;
        let row = RowRef::Existing(edit.row_id);
        let column = week_column(&grid.scope, row, &edit.week)?;
        let value = parse_cell(&edit.value, row, &edit.week)?;
        if edits.deleted_rows.contains(&edit.row_id) {
            continue;
        }
        if cell_edits.insert((edit.row_id, column), value).is_none() {
            edit_order.push((edit.row_id, column));
        }
    }

    let mut rows = Vec::with_capacity(grid.rows.len() + edits.added_rows.len());
    let mut deleted_projects = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped: HashSet<RowId> = HashSet::new();

    for row in &grid.rows {
        if edits.deleted_rows.contains(&row.row_id) {
            deleted_projects.push(row.project.clone());
            continue;
        }
        let origin = RowRef::Existing(row.row_id);
        let project = renames
            .get(&row.row_id)
            .copied()
            .unwrap_or(row.project.as_str())
            .trim()
            .to_string();
        if project.is_empty() {
            skipped.insert(row.row_id);
            warnings.push(missing_identifier(origin));
            continue;
        }

        let mut cells: Vec<Option<f64>> = row.cells.iter().copied().map(Some).collect();
        for (column, cell) in cells.iter_mut().enumerate() {
            if let Some(value) = cell_edits.get(&(row.row_id, column)) {
                *cell = *value;
            }
        }
        rows.push(EditedRow {
            origin,
            original_project: Some(row.project.clone()),
            project,
            cells,
        });
    }

    let mut touched = Vec::new();
    for (row_id, column) in edit_order {
        if skipped.contains(&row_id) {
            continue;
        }
        if let Some(row) = rows.iter().find(|row| row.origin == RowRef::Existing(row_id)) {
            touched.push((row.project.clone(), column));
        }
    }

    for (index, added) in edits.added_rows.iter().enumerate() {
        let origin = RowRef::Added(index);
        let mut cells: Vec<Option<f64>> = vec![None; grid.scope.weeks.len()];
        let mut written = Vec::with_capacity(added.values.len());
        for (week, value) in &added.values {
            let column = week_column(&grid.scope, origin, week)?;
            cells[column] = parse_cell(value, origin, week)?;
            written.push(column);
        }

        let project = added.project.as_deref().unwrap_or_default().trim().to_string();
        if project.is_empty() {
            warnings.push(missing_identifier(origin));
            continue;
        }
        for column in written {
            touched.push((project.clone(), column));
        }
        rows.push(EditedRow {
            origin,
            original_project: None,
            project,
            cells,
        });
    }

    Ok(EditedGrid {
        scope: grid.scope.clone(),
        rows,
        deleted_projects,
        touched,
        warnings,
    })
}

/// Rewrites the grid scope as one block placed where its first prior entry was.
///
/// Inside the block each row's entries are written in grid row order, followed
/// by the out-of-window entries carried under its name, so projecting the
/// result again yields the same row order.
fn full_replace(prior: &[Entry], edited: &EditedGrid) -> Vec<Entry> {
    let scope = &edited.scope;
    let renames = edited.renames();
    let purged = edited.purged_projects();

    let mut entries = Vec::with_capacity(prior.len());
    let mut block_at = None;
    let mut carried: Vec<Entry> = Vec::new();
    for entry in prior {
        if !entry.matches(&scope.employee, scope.status) {
            entries.push(entry.clone());
            continue;
        }
        block_at.get_or_insert(entries.len());
        if scope.contains_week(&entry.week) || purged.contains(entry.project.as_str()) {
            continue;
        }
        let mut entry = entry.clone();
        if let Some(renamed) = renames.get(entry.project.as_str()) {
            entry.project = renamed.to_string();
        }
        carried.push(entry);
    }

    let mut block = Vec::with_capacity(carried.len() + edited.rows.len() * scope.weeks.len());
    let mut placed: HashSet<&str> = HashSet::new();
    for row in &edited.rows {
        block.extend(edited.emitted_entries(row));
        if placed.insert(row.project.as_str()) {
            block.extend(
                carried
                    .iter()
                    .filter(|entry| entry.project == row.project)
                    .cloned(),
            );
        }
    }
    block.extend(
        carried
            .into_iter()
            .filter(|entry| !placed.contains(entry.project.as_str())),
    );

    let tail = entries.split_off(block_at.unwrap_or(entries.len()));
    entries.extend(block);
    entries.extend(tail);
    coalesce_entries(entries)
}

fn incremental_upsert(prior: &[Entry], edited: &EditedGrid) -> Vec<Entry> {
    let scope = &edited.scope;
    let renames = edited.renames();
    let purged = edited.purged_projects();

    let mut entries = Vec::with_capacity(prior.len() + edited.touched.len());
    for entry in prior {
        let in_scope = entry.matches(&scope.employee, scope.status);
        if in_scope && purged.contains(entry.project.as_str()) {
            continue;
        }
        let mut entry = entry.clone();
        if in_scope {
            if let Some(renamed) = renames.get(entry.project.as_str()) {
                entry.project = renamed.to_string();
            }
        }
        entries.push(entry);
    }
    let mut entries = coalesce_entries(entries);

    let mut written: HashSet<(&str, usize)> = HashSet::new();
    for (project, column) in &edited.touched {
        if !written.insert((project.as_str(), *column)) {
            continue;
        }
        let week = &scope.weeks[*column];
        let existing = entries.iter().position(|entry| {
            entry.matches(&scope.employee, scope.status)
                && entry.project == *project
                && entry.week == *week
        });
        match (existing, edited.cell_total(project, *column)) {
            (Some(index), Some(hours)) => entries[index].hours = hours,
            (Some(index), None) => {
                entries.remove(index);
            }
            (None, Some(hours)) => entries.push(edited.entry(project, *column, hours)),
            (None, None) => {}
        }
    }

    entries
}

fn week_column(scope: &GridScope, row: RowRef, week: &str) -> Result<usize, ReconcileError> {
    scope
        .week_index(week)
        .ok_or_else(|| ReconcileError::UnknownWeek {
            row,
            week: week.to_string(),
        })
}

fn parse_cell(value: &CellValue, row: RowRef, week: &str) -> Result<Option<f64>, ReconcileError> {
    let invalid = |raw: String| ReconcileError::InvalidHoursValue {
        row,
        week: week.to_string(),
        value: raw,
    };
    let hours = match value {
        CellValue::Empty => return Ok(None),
        CellValue::Number(number) => *number,
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| invalid(text.clone()))?
        }
    };
    if !hours.is_finite() || hours < 0.0 {
        return Err(invalid(hours.to_string()));
    }
    Ok(Some(hours))
}

fn missing_identifier(row: RowRef) -> ReconcileWarning {
    warn!(
        "event=reconcile_row module=grid status=skipped reason=missing_identifier row={}",
        row
    );
    ReconcileWarning::MissingIdentifier { row }
}

#[cfg(test)]
mod tests {
    use super::{parse_cell, ReconcileError, ReconcilePolicy, RowRef};
    use crate::model::edit::CellValue;
    use crate::model::grid::RowId;

    #[test]
    fn parse_cell_accepts_numbers_and_numeric_text() {
        let row = RowRef::Existing(RowId(0));
        assert_eq!(parse_cell(&CellValue::Number(4.0), row, "01-Jan"), Ok(Some(4.0)));
        assert_eq!(parse_cell(&CellValue::from(" 7.5 "), row, "01-Jan"), Ok(Some(7.5)));
        assert_eq!(parse_cell(&CellValue::from("  "), row, "01-Jan"), Ok(None));
        assert_eq!(parse_cell(&CellValue::Empty, row, "01-Jan"), Ok(None));
    }

    #[test]
    fn parse_cell_rejects_text_negative_and_nan() {
        let row = RowRef::Added(1);
        for value in [
            CellValue::from("eight"),
            CellValue::Number(-2.0),
            CellValue::Number(f64::NAN),
            CellValue::from("inf"),
        ] {
            let err = parse_cell(&value, row, "08-Jan").unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidHoursValue { .. }));
            assert!(err.to_string().starts_with("InvalidHoursValue"));
        }
    }

    #[test]
    fn policy_parse_accepts_cli_spellings() {
        assert_eq!(
            ReconcilePolicy::parse("full-replace"),
            Some(ReconcilePolicy::FullReplace)
        );
        assert_eq!(
            ReconcilePolicy::parse("Incremental_Upsert"),
            Some(ReconcilePolicy::IncrementalUpsert)
        );
        assert_eq!(ReconcilePolicy::parse("merge"), None);
        assert_eq!(ReconcilePolicy::default(), ReconcilePolicy::FullReplace);
    }
}
