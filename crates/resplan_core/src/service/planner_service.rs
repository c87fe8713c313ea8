//! Hour planning use-case service.
//!
//! # Responsibility
//! - Own the transaction boundary: load snapshot, project, reconcile, save.
//! - Skip writes when the edited grids are unchanged.
//!
//! # Invariants
//! - Every grid session remembers the store revision it was projected from.
//! - A submit against an outdated revision fails and writes nothing.
//! - All grids of one submit are persisted by a single save.

use crate::grid::fingerprint::{fingerprint, has_changed, GridFingerprint};
use crate::grid::projection::project;
use crate::grid::reconcile::{reconcile, ReconcileError, ReconcilePolicy, ReconcileWarning};
use crate::model::edit::EditSet;
use crate::model::entry::{Entry, EntryStatus};
use crate::model::grid::Grid;
use crate::report::utilization::{self, WeekUtilization};
use crate::repo::record_store::{RecordStore, RepoError};
use crate::repo::tables::{entries_from_table, entries_to_table, ENTRY_COLUMNS};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors from planner use-cases.
#[derive(Debug)]
pub enum PlannerError {
    /// Store failure, including stale revisions.
    Repo(RepoError),
    /// Edit set rejected during reconciliation.
    Reconcile(ReconcileError),
}

impl Display for PlannerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Reconcile(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Reconcile(err) => Some(err),
        }
    }
}

impl From<RepoError> for PlannerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ReconcileError> for PlannerError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

/// Loaded entries plus the store revision they were read at.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub entries: Vec<Entry>,
    pub revision: u64,
}

/// A grid handed to an editor, bound to the revision it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSession {
    pub grid: Grid,
    pub revision: u64,
    pub fingerprint: GridFingerprint,
}

impl GridSession {
    fn new(grid: Grid, revision: u64) -> Self {
        let fingerprint = fingerprint(&grid);
        Self {
            grid,
            revision,
            fingerprint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Nothing differed from the sessions; no write happened.
    Unchanged,
    /// Entries were saved at `revision`.
    Saved { revision: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub status: SubmitStatus,
    pub warnings: Vec<ReconcileWarning>,
    /// Post-edit grid of each reconciled session, in submit order.
    pub edited_grids: Vec<Grid>,
}

/// Planner facade over one entries store.
pub struct PlannerService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> PlannerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads all entries with the revision they were read at.
    pub fn load_snapshot(&self) -> PlannerResult<EntrySnapshot> {
        let revision = self.store.revision()?;
        let table = self.store.load(&ENTRY_COLUMNS)?;
        let entries = entries_from_table(&table)?;
        Ok(EntrySnapshot { entries, revision })
    }

    pub fn load_entries(&self) -> PlannerResult<Vec<Entry>> {
        Ok(self.load_snapshot()?.entries)
    }

    /// Projects one status grid for editing.
    pub fn open_grid(
        &self,
        employee: &str,
        status: EntryStatus,
        weeks: &[String],
    ) -> PlannerResult<GridSession> {
        let snapshot = self.load_snapshot()?;
        let grid = project(&snapshot.entries, employee, status, weeks);
        Ok(GridSession::new(grid, snapshot.revision))
    }

    /// Projects one grid per status from a single snapshot.
    pub fn open_status_grids(
        &self,
        employee: &str,
        weeks: &[String],
    ) -> PlannerResult<Vec<GridSession>> {
        let snapshot = self.load_snapshot()?;
        Ok(EntryStatus::ALL
            .iter()
            .map(|status| {
                let grid = project(&snapshot.entries, employee, *status, weeks);
                GridSession::new(grid, snapshot.revision)
            })
            .collect())
    }

    /// Reconciles and saves one session's edits.
    pub fn submit(
        &self,
        session: &GridSession,
        edits: &EditSet,
        policy: ReconcilePolicy,
    ) -> PlannerResult<SubmitReport> {
        self.submit_all(&[(session, edits)], policy)
    }

    /// Reconciles several sessions in order and saves once.
    ///
    /// # Errors
    /// - `RepoError::StaleRevision` when the store moved past any session.
    /// - `ReconcileError` when any edit set is invalid; nothing is saved.
    pub fn submit_all(
        &self,
        submissions: &[(&GridSession, &EditSet)],
        policy: ReconcilePolicy,
    ) -> PlannerResult<SubmitReport> {
        let snapshot = self.load_snapshot()?;
        for (session, _) in submissions {
            if session.revision != snapshot.revision {
                return Err(RepoError::StaleRevision {
                    expected: session.revision,
                    actual: snapshot.revision,
                }
                .into());
            }
        }

        let mut entries = snapshot.entries;
        let mut warnings = Vec::new();
        let mut edited_grids = Vec::new();
        for (session, edits) in submissions {
            if edits.is_empty() {
                continue;
            }
            let outcome = reconcile(&entries, &session.grid, edits, policy)?;
            warnings.extend(outcome.warnings);
            if !has_changed(&session.fingerprint, &fingerprint(&outcome.edited_grid)) {
                continue;
            }
            entries = outcome.entries;
            edited_grids.push(outcome.edited_grid);
        }

        if edited_grids.is_empty() {
            info!(
                "event=submit module=service status=ok result=unchanged grids={} warnings={}",
                submissions.len(),
                warnings.len()
            );
            return Ok(SubmitReport {
                status: SubmitStatus::Unchanged,
                warnings,
                edited_grids,
            });
        }

        let table = entries_to_table(&entries)?;
        let revision = self.store.save_if_revision(&table, snapshot.revision)?;
        info!(
            "event=submit module=service status=ok result=saved grids={} changed={} entries={} revision={}",
            submissions.len(),
            edited_grids.len(),
            entries.len(),
            revision
        );
        Ok(SubmitReport {
            status: SubmitStatus::Saved { revision },
            warnings,
            edited_grids,
        })
    }

    /// Per-week totals across Confirmed, Tentative and Leave.
    pub fn weekly_totals(&self, employee: &str, weeks: &[String]) -> PlannerResult<Vec<f64>> {
        let entries = self.load_entries()?;
        Ok(utilization::weekly_totals(&entries, employee, weeks))
    }

    pub fn utilization(
        &self,
        employee: &str,
        weeks: &[String],
        full_time_hours: f64,
    ) -> PlannerResult<Vec<WeekUtilization>> {
        let entries = self.load_entries()?;
        Ok(utilization::utilization(
            &entries,
            employee,
            weeks,
            full_time_hours,
        ))
    }
}
