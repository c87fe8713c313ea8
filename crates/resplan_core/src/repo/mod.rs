//! Record store abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-table load/save contract used by services.
//! - Isolate SQLite and file details from reconciliation logic.
//!
//! # Invariants
//! - Loads tolerate missing storage; corrupt storage is an error.
//! - Saves are full overwrites, never appends.

pub mod file_store;
pub mod record_store;
pub mod tables;
