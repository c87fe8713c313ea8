//! Domain model for planned hours and their editable projections.
//!
//! # Responsibility
//! - Define the normalized `Entry` record shared by every layer.
//! - Define the ephemeral grid and edit-set shapes exchanged with the UI.
//!
//! # Invariants
//! - At most one `Entry` exists per `(employee, project, week, status)`.
//! - Duplicate entries are coalesced by summing hours, never rejected.
//! - Grids and edit sets own no persistent state.

pub mod edit;
pub mod entry;
pub mod grid;
pub mod skill;
pub mod week;
