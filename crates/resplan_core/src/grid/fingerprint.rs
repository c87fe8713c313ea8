//! Grid change detection.
//!
//! The fingerprint only gates whether reconciliation runs; it is never used
//! to decide what to write.

use crate::model::grid::Grid;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

/// Opaque content token of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridFingerprint(String);

impl GridFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GridFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes week columns, row identifiers and cell values, all in order.
///
/// Snapshot ids, row ids, employee and status are not part of the hash.
pub fn fingerprint(grid: &Grid) -> GridFingerprint {
    let mut hasher = Sha256::new();

    hasher.update((grid.scope.weeks.len() as u64).to_le_bytes());
    for week in &grid.scope.weeks {
        update_str(&mut hasher, week);
    }

    hasher.update((grid.rows.len() as u64).to_le_bytes());
    for row in &grid.rows {
        update_str(&mut hasher, &row.project);
        for cell in &row.cells {
            // -0.0 and 0.0 render identically in a grid.
            let normalized = if *cell == 0.0 { 0.0f64 } else { *cell };
            hasher.update(normalized.to_bits().to_le_bytes());
        }
    }

    GridFingerprint(format!("{:x}", hasher.finalize()))
}

/// Returns whether two fingerprints describe different grid content.
pub fn has_changed(old: &GridFingerprint, new: &GridFingerprint) -> bool {
    old != new
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::{fingerprint, has_changed};
    use crate::model::entry::EntryStatus;
    use crate::model::grid::{Grid, GridRow, GridScope, RowId};

    fn grid(rows: &[(&str, [f64; 2])]) -> Grid {
        let weeks = vec!["01-Jan".to_string(), "08-Jan".to_string()];
        let mut grid = Grid::empty(GridScope::new("E1", EntryStatus::Confirmed, &weeks));
        for (index, (project, cells)) in rows.iter().enumerate() {
            grid.rows.push(GridRow {
                row_id: RowId(index as u32),
                project: project.to_string(),
                cells: cells.to_vec(),
            });
        }
        grid
    }

    #[test]
    fn identical_content_ignores_snapshot_id() {
        let first = grid(&[("Acme", [8.0, 0.0])]);
        let second = grid(&[("Acme", [8.0, -0.0])]);
        assert_ne!(first.snapshot_id, second.snapshot_id);
        assert!(!has_changed(&fingerprint(&first), &fingerprint(&second)));
    }

    #[test]
    fn row_order_and_values_change_fingerprint() {
        let base = fingerprint(&grid(&[("Acme", [8.0, 0.0]), ("Beta", [1.0, 2.0])]));
        let swapped = fingerprint(&grid(&[("Beta", [1.0, 2.0]), ("Acme", [8.0, 0.0])]));
        let edited = fingerprint(&grid(&[("Acme", [8.0, 0.5]), ("Beta", [1.0, 2.0])]));
        assert!(has_changed(&base, &swapped));
        assert!(has_changed(&base, &edited));
        assert_eq!(base.as_str().len(), 64);
    }
}
