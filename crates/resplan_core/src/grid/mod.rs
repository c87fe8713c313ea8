//! Grid projection, reconciliation and change detection.
//!
//! # Responsibility
//! - Turn flat entries into a dense editable grid and back.
//! - Decide cheaply whether an edited grid needs reconciling.
//!
//! # Invariants
//! - Projection and reconciliation share one `GridScope` per interaction.
//! - Reconciliation is idempotent, so the change gate is never load-bearing.

pub mod fingerprint;
pub mod projection;
pub mod reconcile;
