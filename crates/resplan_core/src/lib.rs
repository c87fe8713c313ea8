//! Core domain logic for the resource planner.
//! This crate is the single source of truth for hour-planning invariants.

pub mod config;
pub mod db;
pub mod grid;
pub mod logging;
pub mod model;
pub mod repo;
pub mod report;
pub mod service;

pub use config::{ConfigError, PlannerConfig};
pub use grid::fingerprint::{fingerprint, has_changed, GridFingerprint};
pub use grid::projection::project;
pub use grid::reconcile::{
    reconcile, ReconcileError, ReconcileOutcome, ReconcilePolicy, ReconcileWarning, RowRef,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::edit::{AddedRow, CellEdit, CellValue, EditSet, RowRename};
pub use model::entry::{Entry, EntryStatus, EntryValidationError};
pub use model::grid::{Grid, GridRow, GridScope, RowId, SnapshotId};
pub use model::skill::{Skill, SkillLevel};
pub use model::week::{week_label, week_window};
pub use repo::file_store::JsonFileRecordStore;
pub use repo::record_store::{
    RecordStore, RecordTable, RepoError, RepoResult, SqliteRecordStore, StoreTable,
};
pub use report::utilization::{UtilizationLevel, WeekUtilization};
pub use service::planner_service::{
    GridSession, PlannerError, PlannerResult, PlannerService, SubmitReport, SubmitStatus,
};
pub use service::roster_service::{RosterError, RosterService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
