//! Task types: status, recurrence and the task record itself.
//!
//! A task moves `Inbox -> Done`; `Active` is kept for forward compatibility
//! and is treated like any other not-done status by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub type TaskId = i64;
pub type ProjectId = i64;
pub type ContextId = i64;

/// Task status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Captured, not yet processed (initial state).
    #[default]
    Inbox,
    /// Reserved; filtering does not distinguish it from Inbox.
    Active,
    /// Completed (terminal).
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::Active => "active",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(TaskStatus::Inbox),
            "active" => Ok(TaskStatus::Active),
            "done" => Ok(TaskStatus::Done),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// How often a task comes back after completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::None => "none",
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
            RecurrencePattern::Yearly => "yearly",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            RecurrencePattern::None => "",
            RecurrencePattern::Daily => "day",
            RecurrencePattern::Weekly => "week",
            RecurrencePattern::Monthly => "month",
            RecurrencePattern::Yearly => "year",
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrencePattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(RecurrencePattern::None),
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            "yearly" => Ok(RecurrencePattern::Yearly),
            other => Err(ValidationError::InvalidValue {
                field: "recurrence".into(),
                message: format!("unknown pattern '{other}'"),
            }),
        }
    }
}

/// Recurrence pattern plus its interval multiplier ("every 2 weeks").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    pub interval: u32,
}

impl Recurrence {
    pub const NONE: Recurrence = Recurrence {
        pattern: RecurrencePattern::None,
        interval: 1,
    };

    pub fn new(pattern: RecurrencePattern, interval: u32) -> Result<Self, ValidationError> {
        if interval == 0 {
            return Err(ValidationError::InvalidInterval(interval));
        }
        Ok(Self { pattern, interval })
    }

    pub fn daily() -> Self {
        Self {
            pattern: RecurrencePattern::Daily,
            interval: 1,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.pattern != RecurrencePattern::None
    }
}

impl Default for Recurrence {
    fn default() -> Self {
        Recurrence::NONE
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pattern, self.interval) {
            (RecurrencePattern::None, _) => f.write_str("-"),
            (pattern, 1) => write!(f, "{pattern}"),
            (pattern, n) => write!(f, "every {n} {}s", pattern.unit()),
        }
    }
}

/// A single actionable item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Store-assigned identifier
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub status: TaskStatus,
    /// Owning project; None means unfiled (Inbox perspective)
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Hidden from every perspective but Completed until this instant
    pub defer_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    /// Manual ordering key, lower first
    pub order_index: Option<i64>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub context_ids: Vec<ContextId>,
    /// Prerequisites: this task is blocked until all of them are done
    #[serde(default)]
    pub dependency_ids: Vec<TaskId>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn is_unfiled(&self) -> bool {
        self.project_id.is_none()
    }

    pub fn has_context(&self, context_id: ContextId) -> bool {
        self.context_ids.contains(&context_id)
    }
}

/// Fields supplied when inserting a task; the store assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub notes: String,
    pub status: TaskStatus,
    pub project_id: Option<ProjectId>,
    pub flagged: bool,
    pub defer_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub order_index: Option<i64>,
    pub recurrence: Recurrence,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Reject drafts the store must never see.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        if self.recurrence.interval == 0 {
            return Err(ValidationError::InvalidInterval(0));
        }
        Ok(())
    }
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}
