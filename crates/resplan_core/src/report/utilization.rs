//! Utilization summaries over one employee's entries.
//!
//! # Invariants
//! - Weekly series are dense over the requested window.
//! - Summaries never mutate or re-coalesce the entries they read.

use crate::grid::projection::project;
use crate::model::entry::{Entry, EntryStatus};
use crate::model::grid::Grid;
use serde::Serialize;
use std::collections::BTreeMap;

/// Contracted hours per week.
pub const DEFAULT_FULL_TIME_HOURS: f64 = 40.0;

/// Statuses counted in the weekly total row of the submission view.
pub const WEEKLY_TOTAL_STATUSES: [EntryStatus; 3] = [
    EntryStatus::Confirmed,
    EntryStatus::Tentative,
    EntryStatus::Leave,
];

/// Sums every week column of a grid.
pub fn sum_hours(grid: &Grid) -> Vec<f64> {
    let mut totals = vec![0.0; grid.scope.weeks.len()];
    for row in &grid.rows {
        for (total, cell) in totals.iter_mut().zip(&row.cells) {
            *total += cell;
        }
    }
    totals
}

/// Per-week totals across Confirmed, Tentative and Leave grids.
pub fn weekly_totals(entries: &[Entry], employee: &str, weeks: &[String]) -> Vec<f64> {
    let mut totals = vec![0.0; weeks.len()];
    for status in WEEKLY_TOTAL_STATUSES {
        let grid = project(entries, employee, status, weeks);
        for (total, value) in totals.iter_mut().zip(sum_hours(&grid)) {
            *total += value;
        }
    }
    totals
}

/// Load classification of one week against contracted hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UtilizationLevel {
    Under,
    Full,
    Over,
}

impl UtilizationLevel {
    pub fn classify(total_hours: f64, full_time_hours: f64) -> Self {
        if total_hours == full_time_hours {
            Self::Full
        } else if total_hours < full_time_hours {
            Self::Under
        } else {
            Self::Over
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Under => "underutilized",
            Self::Full => "full",
            Self::Over => "overutilized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekUtilization {
    pub week: String,
    pub total_hours: f64,
    pub level: UtilizationLevel,
}

/// Classifies each window week using hours of every status.
pub fn utilization(
    entries: &[Entry],
    employee: &str,
    weeks: &[String],
    full_time_hours: f64,
) -> Vec<WeekUtilization> {
    weeks
        .iter()
        .map(|week| {
            let total_hours = entries
                .iter()
                .filter(|entry| entry.employee == employee && entry.week == *week)
                .map(|entry| entry.hours)
                .sum();
            WeekUtilization {
                week: week.clone(),
                total_hours,
                level: UtilizationLevel::classify(total_hours, full_time_hours),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectWeekHours {
    pub week: String,
    pub project: String,
    pub hours: f64,
}

/// Hours per `(week, project)` across statuses, ordered by week then project.
pub fn hours_by_project(entries: &[Entry], employee: &str) -> Vec<ProjectWeekHours> {
    let mut grouped: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.employee == employee) {
        *grouped
            .entry((entry.week.as_str(), entry.project.as_str()))
            .or_insert(0.0) += entry.hours;
    }
    grouped
        .into_iter()
        .map(|((week, project), hours)| ProjectWeekHours {
            week: week.to_string(),
            project: project.to_string(),
            hours,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{hours_by_project, utilization, weekly_totals, UtilizationLevel};
    use crate::model::entry::{Entry, EntryStatus};

    fn weeks() -> Vec<String> {
        vec!["01-Jan".to_string(), "08-Jan".to_string()]
    }

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("E1", "Acme", "01-Jan", 30.0, EntryStatus::Confirmed),
            Entry::new("E1", "Beta", "01-Jan", 10.0, EntryStatus::Tentative),
            Entry::new("E1", "Pitch", "08-Jan", 6.0, EntryStatus::Bd),
            Entry::new("E1", "Vacation", "08-Jan", 40.0, EntryStatus::Leave),
            Entry::new("E2", "Acme", "01-Jan", 12.0, EntryStatus::Confirmed),
        ]
    }

    #[test]
    fn weekly_totals_exclude_bd_and_other_employees() {
        assert_eq!(weekly_totals(&entries(), "E1", &weeks()), vec![40.0, 40.0]);
    }

    #[test]
    fn utilization_classifies_against_full_time() {
        let report = utilization(&entries(), "E1", &weeks(), 40.0);
        assert_eq!(report[0].level, UtilizationLevel::Full);
        assert_eq!(report[1].total_hours, 46.0);
        assert_eq!(report[1].level, UtilizationLevel::Over);
        assert_eq!(
            UtilizationLevel::classify(12.0, 40.0),
            UtilizationLevel::Under
        );
    }

    #[test]
    fn hours_by_project_orders_by_week_then_project() {
        let rows = hours_by_project(&entries(), "E1");
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|row| (row.week.as_str(), row.project.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("01-Jan", "Acme"),
                ("01-Jan", "Beta"),
                ("08-Jan", "Pitch"),
                ("08-Jan", "Vacation")
            ]
        );
    }
}
