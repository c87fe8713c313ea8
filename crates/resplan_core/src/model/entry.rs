//! Normalized hour entry model.
//!
//! # Responsibility
//! - Define the flat record persisted by the record store.
//! - Provide validation and duplicate coalescing helpers.
//!
//! # Invariants
//! - `employee`, `project` and `week` are never blank for a valid entry.
//! - `hours` is finite and never negative.
//! - Coalescing sums duplicate keys and keeps first-seen key order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Employee identifier as entered in the roster.
pub type EmployeeId = String;

/// Category of time an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Committed project work.
    Confirmed,
    /// Planned but not yet committed work.
    Tentative,
    /// Business development time.
    #[serde(rename = "BD")]
    Bd,
    /// Leave or vacation.
    Leave,
}

impl EntryStatus {
    /// Every status in display order.
    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::Confirmed,
        EntryStatus::Tentative,
        EntryStatus::Bd,
        EntryStatus::Leave,
    ];

    /// Returns the stored label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Tentative => "Tentative",
            Self::Bd => "BD",
            Self::Leave => "Leave",
        }
    }

    /// Parses a stored label. Matching is exact after trimming.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Confirmed" => Some(Self::Confirmed),
            "Tentative" => Some(Self::Tentative),
            "BD" => Some(Self::Bd),
            "Leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for entry invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValidationError {
    BlankEmployee,
    BlankProject,
    BlankWeek,
    InvalidHours(f64),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankEmployee => write!(f, "entry employee must not be blank"),
            Self::BlankProject => write!(f, "entry project must not be blank"),
            Self::BlankWeek => write!(f, "entry week must not be blank"),
            Self::InvalidHours(hours) => {
                write!(f, "entry hours must be finite and positive, got {hours}")
            }
        }
    }
}

impl Error for EntryValidationError {}

/// Identity of an entry inside the flat store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub employee: EmployeeId,
    pub project: String,
    pub week: String,
    pub status: EntryStatus,
}

/// One normalized `(employee, project, week, hours, status)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub employee: EmployeeId,
    /// Project name or leave/time type shown as the grid row identifier.
    pub project: String,
    /// Opaque week label, e.g. `01-Jan`.
    pub week: String,
    pub hours: f64,
    pub status: EntryStatus,
}

impl Entry {
    pub fn new(
        employee: impl Into<String>,
        project: impl Into<String>,
        week: impl Into<String>,
        hours: f64,
        status: EntryStatus,
    ) -> Self {
        Self {
            employee: employee.into(),
            project: project.into(),
            week: week.into(),
            hours,
            status,
        }
    }

    /// Returns the uniqueness key of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            employee: self.employee.clone(),
            project: self.project.clone(),
            week: self.week.clone(),
            status: self.status,
        }
    }

    /// Returns whether this entry belongs to the given employee/status scope.
    pub fn matches(&self, employee: &str, status: EntryStatus) -> bool {
        self.status == status && self.employee == employee
    }

    /// Validates entry invariants.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.employee.trim().is_empty() {
            return Err(EntryValidationError::BlankEmployee);
        }
        if self.project.trim().is_empty() {
            return Err(EntryValidationError::BlankProject);
        }
        if self.week.trim().is_empty() {
            return Err(EntryValidationError::BlankWeek);
        }
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(EntryValidationError::InvalidHours(self.hours));
        }
        Ok(())
    }
}

/// Coalesces duplicate keys by summing their hours.
///
/// Output keeps the order in which each key was first seen. Keys whose
/// total is zero are dropped, since a zero-hour entry is never stored.
pub fn coalesce_entries(entries: impl IntoIterator<Item = Entry>) -> Vec<Entry> {
    let mut positions: HashMap<EntryKey, usize> = HashMap::new();
    let mut coalesced: Vec<Entry> = Vec::new();

    for entry in entries {
        match positions.get(&entry.key()) {
            Some(&index) => coalesced[index].hours += entry.hours,
            None => {
                positions.insert(entry.key(), coalesced.len());
                coalesced.push(entry);
            }
        }
    }

    coalesced.retain(|entry| entry.hours > 0.0);
    coalesced
}

#[cfg(test)]
mod tests {
    use super::{coalesce_entries, Entry, EntryStatus, EntryValidationError};

    #[test]
    fn status_labels_round_trip() {
        for status in EntryStatus::ALL {
            assert_eq!(EntryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EntryStatus::parse(" BD "), Some(EntryStatus::Bd));
        assert_eq!(EntryStatus::parse("confirmed"), None);
    }

    #[test]
    fn coalesce_sums_duplicates_in_first_seen_order() {
        let entries = vec![
            Entry::new("E1", "Beta", "01-Jan", 2.0, EntryStatus::Confirmed),
            Entry::new("E1", "Acme", "01-Jan", 3.0, EntryStatus::Confirmed),
            Entry::new("E1", "Beta", "01-Jan", 5.0, EntryStatus::Confirmed),
            Entry::new("E1", "Beta", "01-Jan", 1.0, EntryStatus::Tentative),
        ];

        let coalesced = coalesce_entries(entries);
        assert_eq!(coalesced.len(), 3);
        assert_eq!(coalesced[0].project, "Beta");
        assert_eq!(coalesced[0].hours, 7.0);
        assert_eq!(coalesced[1].project, "Acme");
        assert_eq!(coalesced[2].status, EntryStatus::Tentative);
    }

    #[test]
    fn coalesce_drops_zero_hour_keys() {
        let entries = vec![
            Entry::new("E1", "Acme", "01-Jan", 0.0, EntryStatus::Confirmed),
            Entry::new("E1", "Acme", "08-Jan", 3.0, EntryStatus::Confirmed),
            Entry::new("E1", "Beta", "08-Jan", 0.0, EntryStatus::Confirmed),
            Entry::new("E1", "Beta", "08-Jan", 1.5, EntryStatus::Confirmed),
        ];

        let coalesced = coalesce_entries(entries);
        assert_eq!(
            coalesced,
            vec![
                Entry::new("E1", "Acme", "08-Jan", 3.0, EntryStatus::Confirmed),
                Entry::new("E1", "Beta", "08-Jan", 1.5, EntryStatus::Confirmed),
            ]
        );
    }

    #[test]
    fn validate_rejects_negative_and_blank_fields() {
        let negative = Entry::new("E1", "Acme", "01-Jan", -1.0, EntryStatus::Leave);
        assert_eq!(
            negative.validate(),
            Err(EntryValidationError::InvalidHours(-1.0))
        );

        let zero = Entry::new("E1", "Acme", "01-Jan", 0.0, EntryStatus::Leave);
        assert_eq!(zero.validate(), Err(EntryValidationError::InvalidHours(0.0)));

        let blank = Entry::new("E1", "  ", "01-Jan", 1.0, EntryStatus::Leave);
        assert_eq!(blank.validate(), Err(EntryValidationError::BlankProject));
    }

    #[test]
    fn status_serializes_with_stored_labels() {
        let json = serde_json::to_value(EntryStatus::Bd).unwrap();
        assert_eq!(json, "BD");
        let decoded: EntryStatus = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, EntryStatus::Bd);
    }
}
