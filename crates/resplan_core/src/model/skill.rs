//! Employee skill matrix model.

use crate::model::entry::EmployeeId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Self-assessed proficiency for one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Expert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Expert => "Expert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Beginner" => Some(Self::Beginner),
            "Intermediate" => Some(Self::Intermediate),
            "Expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

impl Display for SkillLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the skill matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub employee: EmployeeId,
    pub skill: String,
    pub level: SkillLevel,
}
