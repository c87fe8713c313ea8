//! Employee roster and skill matrix service.
//!
//! # Invariants
//! - Employee names are trimmed and unique.
//! - Skills can only be recorded for rostered employees.

use crate::model::skill::{Skill, SkillLevel};
use crate::repo::record_store::{RecordStore, RepoError};
use crate::repo::tables::{
    employees_from_table, employees_to_table, skills_from_table, skills_to_table,
    EMPLOYEE_COLUMNS, SKILL_COLUMNS,
};
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RosterError {
    /// Name is blank after trim.
    InvalidName,
    /// Skill is blank after trim.
    InvalidSkill,
    DuplicateEmployee(String),
    UnknownEmployee(String),
    Repo(RepoError),
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "employee name must not be blank"),
            Self::InvalidSkill => write!(f, "skill must not be blank"),
            Self::DuplicateEmployee(name) => write!(f, "employee already exists: {name}"),
            Self::UnknownEmployee(name) => write!(f, "employee not found: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RosterError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Roster facade over the employees and skills stores.
pub struct RosterService<E: RecordStore, K: RecordStore> {
    employees: E,
    skills: K,
}

impl<E: RecordStore, K: RecordStore> RosterService<E, K> {
    pub fn new(employees: E, skills: K) -> Self {
        Self { employees, skills }
    }

    /// Lists employees sorted and de-duplicated.
    pub fn list_employees(&self) -> Result<Vec<String>, RosterError> {
        let table = self.employees.load(&EMPLOYEE_COLUMNS)?;
        let unique: BTreeSet<String> = employees_from_table(&table).into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    /// Adds one employee and returns the stored (trimmed) name.
    pub fn add_employee(&self, name: &str) -> Result<String, RosterError> {
        let name = normalize(name).ok_or(RosterError::InvalidName)?;
        let revision = self.employees.revision()?;
        let table = self.employees.load(&EMPLOYEE_COLUMNS)?;
        let mut employees = employees_from_table(&table);
        if employees.iter().any(|existing| *existing == name) {
            return Err(RosterError::DuplicateEmployee(name));
        }

        employees.push(name.clone());
        let unique: BTreeSet<String> = employees.into_iter().collect();
        let employees: Vec<String> = unique.into_iter().collect();
        self.employees
            .save_if_revision(&employees_to_table(&employees)?, revision)?;
        info!(
            "event=employee_add module=service status=ok employees={}",
            employees.len()
        );
        Ok(name)
    }

    pub fn add_skill(
        &self,
        employee: &str,
        skill: &str,
        level: SkillLevel,
    ) -> Result<Skill, RosterError> {
        let employee = normalize(employee).ok_or(RosterError::InvalidName)?;
        let skill = normalize(skill).ok_or(RosterError::InvalidSkill)?;
        if !self.list_employees()?.contains(&employee) {
            return Err(RosterError::UnknownEmployee(employee));
        }

        let revision = self.skills.revision()?;
        let mut skills = skills_from_table(&self.skills.load(&SKILL_COLUMNS)?)?;
        let added = Skill {
            employee,
            skill,
            level,
        };
        skills.push(added.clone());
        self.skills
            .save_if_revision(&skills_to_table(&skills)?, revision)?;
        info!(
            "event=skill_add module=service status=ok skills={}",
            skills.len()
        );
        Ok(added)
    }

    /// Skills of one employee in insertion order.
    pub fn skills_for(&self, employee: &str) -> Result<Vec<Skill>, RosterError> {
        let employee = employee.trim();
        let skills = skills_from_table(&self.skills.load(&SKILL_COLUMNS)?)?;
        Ok(skills
            .into_iter()
            .filter(|skill| skill.employee == employee)
            .collect())
    }
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
