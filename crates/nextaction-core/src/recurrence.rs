//! Recurrence expander: completing a recurring task materialises its next
//! occurrence as a fresh Inbox task.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{Result, ValidationError};
use crate::store::TaskStore;
use crate::task::{NewTask, Recurrence, RecurrencePattern, Task, TaskId, TaskStatus};

/// What happens to defer/due dates when a successor is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// The successor starts undated.
    #[default]
    Keep,
    /// Dates present on the completed task are shifted by one interval.
    Advance,
}

impl fmt::Display for DatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePolicy::Keep => f.write_str("keep"),
            DatePolicy::Advance => f.write_str("advance"),
        }
    }
}

impl FromStr for DatePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(DatePolicy::Keep),
            "advance" => Ok(DatePolicy::Advance),
            other => Err(ValidationError::InvalidValue {
                field: "date_policy".into(),
                message: format!("expected keep or advance, got '{other}'"),
            }),
        }
    }
}

/// Shift `instant` by one recurrence step.
///
/// Months and years are calendar arithmetic, clamped to the last day of
/// shorter months (Jan 31 + 1 month = Feb 28/29). Returns `None` on overflow.
pub fn advance(instant: DateTime<Utc>, recurrence: Recurrence) -> Option<DateTime<Utc>> {
    let n = recurrence.interval;
    match recurrence.pattern {
        RecurrencePattern::None => Some(instant),
        RecurrencePattern::Daily => instant.checked_add_signed(Duration::days(i64::from(n))),
        RecurrencePattern::Weekly => instant.checked_add_signed(Duration::weeks(i64::from(n))),
        RecurrencePattern::Monthly => instant.checked_add_months(Months::new(n)),
        RecurrencePattern::Yearly => instant.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Draft for the next occurrence, or `None` when the task does not recur.
pub fn successor_draft(completed: &Task, policy: DatePolicy) -> Option<NewTask> {
    if !completed.recurrence.is_recurring() {
        return None;
    }

    let (defer_at, due_at) = match policy {
        DatePolicy::Keep => (None, None),
        DatePolicy::Advance => (
            completed
                .defer_at
                .and_then(|d| advance(d, completed.recurrence)),
            completed.due_at.and_then(|d| advance(d, completed.recurrence)),
        ),
    };

    Some(NewTask {
        title: completed.title.clone(),
        notes: completed.notes.clone(),
        status: TaskStatus::Inbox,
        project_id: completed.project_id,
        flagged: false,
        defer_at,
        due_at,
        order_index: None,
        recurrence: completed.recurrence,
    })
}

/// Create the successor of a just-completed task in `store`.
///
/// Context tags are carried over. Returns the new id, or `None` for a
/// non-recurring task.
pub fn expand_recurrence<S: TaskStore + ?Sized>(
    store: &S,
    completed: &Task,
    policy: DatePolicy,
) -> Result<Option<TaskId>> {
    let Some(draft) = successor_draft(completed, policy) else {
        return Ok(None);
    };

    let id = store.create_task(&draft)?;
    for context_id in &completed.context_ids {
        if let Err(e) = store.add_context_to_task(id, *context_id) {
            // Leave no half-built successor behind.
            if let Err(cleanup) = store.delete_task(id) {
                warn!(successor = id, error = %cleanup, "failed to remove partial successor");
            }
            return Err(e);
        }
    }
    debug!(task_id = id, contexts = completed.context_ids.len(), "copied successor contexts");
    info!(
        completed = completed.id,
        successor = id,
        recurrence = %completed.recurrence,
        "expanded recurring task"
    );
    Ok(Some(id))
}
