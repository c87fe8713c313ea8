//! Conversions between record tables and domain records.
//!
//! # Invariants
//! - Rows missing a key field are skipped, not errors.
//! - Present but unparseable values are `RepoError::InvalidData`.
//! - Loaded entries are coalesced by summing duplicate keys.
//! - Stored zero-hour rows load as no entry.

use crate::model::entry::{coalesce_entries, Entry, EntryStatus};
use crate::model::skill::{Skill, SkillLevel};
use crate::repo::record_store::{RecordTable, RepoError, RepoResult};
use log::warn;

/// Column set of the entries table.
pub const ENTRY_COLUMNS: [&str; 5] = ["Employee", "Week", "Project", "Hours", "Status"];
/// Column set of the employee roster table.
pub const EMPLOYEE_COLUMNS: [&str; 1] = ["Employee"];
/// Column set of the skill matrix table.
pub const SKILL_COLUMNS: [&str; 3] = ["Employee", "Skill", "Level"];

/// Parses an entries table into coalesced entries.
pub fn entries_from_table(table: &RecordTable) -> RepoResult<Vec<Entry>> {
    let mut entries = Vec::with_capacity(table.len());
    let mut skipped = 0usize;

    for row in 0..table.len() {
        let fields = (
            non_blank(table.get(row, "Employee")),
            non_blank(table.get(row, "Project")),
            non_blank(table.get(row, "Week")),
            non_blank(table.get(row, "Hours")),
            non_blank(table.get(row, "Status")),
        );
        let (Some(employee), Some(project), Some(week), Some(hours), Some(status)) = fields else {
            skipped += 1;
            continue;
        };

        let status = EntryStatus::parse(status).ok_or_else(|| {
            RepoError::InvalidData(format!("unknown status `{status}` in entries row {row}"))
        })?;
        let hours = parse_stored_hours(hours, row)?;
        entries.push(Entry::new(employee, project, week, hours, status));
    }

    if skipped > 0 {
        warn!(
            "event=entries_parse module=repo status=ok skipped_rows={} reason=missing_fields",
            skipped
        );
    }
    Ok(coalesce_entries(entries))
}

/// Converts entries into an entries table. Entries are validated first.
pub fn entries_to_table(entries: &[Entry]) -> RepoResult<RecordTable> {
    let mut table = RecordTable::empty(&ENTRY_COLUMNS);
    for entry in entries {
        entry.validate()?;
        table.push_row(vec![
            Some(entry.employee.clone()),
            Some(entry.week.clone()),
            Some(entry.project.clone()),
            Some(entry.hours.to_string()),
            Some(entry.status.as_str().to_string()),
        ])?;
    }
    Ok(table)
}

/// Reads roster names in stored order, trimmed, blanks dropped.
pub fn employees_from_table(table: &RecordTable) -> Vec<String> {
    (0..table.len())
        .filter_map(|row| non_blank(table.get(row, "Employee")))
        .map(str::to_string)
        .collect()
}

pub fn employees_to_table(employees: &[String]) -> RepoResult<RecordTable> {
    let mut table = RecordTable::empty(&EMPLOYEE_COLUMNS);
    for employee in employees {
        table.push_row(vec![Some(employee.clone())])?;
    }
    Ok(table)
}

/// Reads skill rows; rows without employee, skill or level are skipped.
pub fn skills_from_table(table: &RecordTable) -> RepoResult<Vec<Skill>> {
    let mut skills = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let (Some(employee), Some(skill), Some(level)) = (
            non_blank(table.get(row, "Employee")),
            non_blank(table.get(row, "Skill")),
            non_blank(table.get(row, "Level")),
        ) else {
            continue;
        };
        let level = SkillLevel::parse(level).ok_or_else(|| {
            RepoError::InvalidData(format!("unknown skill level `{level}` in skills row {row}"))
        })?;
        skills.push(Skill {
            employee: employee.to_string(),
            skill: skill.to_string(),
            level,
        });
    }
    Ok(skills)
}

pub fn skills_to_table(skills: &[Skill]) -> RepoResult<RecordTable> {
    let mut table = RecordTable::empty(&SKILL_COLUMNS);
    for skill in skills {
        table.push_row(vec![
            Some(skill.employee.clone()),
            Some(skill.skill.clone()),
            Some(skill.level.as_str().to_string()),
        ])?;
    }
    Ok(table)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_stored_hours(value: &str, row: usize) -> RepoResult<f64> {
    match value.parse::<f64>() {
        Ok(hours) if hours.is_finite() && hours >= 0.0 => Ok(hours),
        _ => Err(RepoError::InvalidData(format!(
            "invalid hours `{value}` in entries row {row}"
        ))),
    }
}
