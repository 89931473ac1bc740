//! Projects group tasks and decide how many of them are actionable at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::task::ProjectId;

/// How a project exposes its tasks to the availability engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Only the earliest-created incomplete task is actionable.
    #[default]
    Sequential,
    /// Every incomplete task is actionable.
    Parallel,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Sequential => "sequential",
            ProjectType::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ProjectType::Sequential),
            "parallel" | "par" => Ok(ProjectType::Parallel),
            other => Err(ValidationError::InvalidValue {
                field: "project_type".into(),
                message: format!("unknown project type '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub project_type: ProjectType,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn is_sequential(&self) -> bool {
        self.project_type == ProjectType::Sequential
    }
}
