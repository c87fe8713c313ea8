//! Read-only summaries derived from flat entries.

pub mod utilization;
