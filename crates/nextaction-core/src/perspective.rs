//! Perspective filter: snapshot + selector + now -> ordered task list.

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::availability::Availability;
use crate::error::ValidationError;
use crate::project::Project;
use crate::task::{ContextId, ProjectId, Task, TaskId};

/// A named view over the task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Perspective {
    #[default]
    Today,
    Anytime,
    Flagged,
    Inbox,
    Completed,
    Project(ProjectId),
    Context(ContextId),
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Perspective::Today => f.write_str("today"),
            Perspective::Anytime => f.write_str("anytime"),
            Perspective::Flagged => f.write_str("flagged"),
            Perspective::Inbox => f.write_str("inbox"),
            Perspective::Completed => f.write_str("completed"),
            Perspective::Project(id) => write!(f, "project:{id}"),
            Perspective::Context(id) => write!(f, "context:{id}"),
        }
    }
}

impl FromStr for Perspective {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let unknown = || ValidationError::UnknownPerspective(s.trim().to_string());

        if let Some((kind, id)) = lowered.split_once(':') {
            let id: i64 = id.trim().parse().map_err(|_| unknown())?;
            return match kind.trim() {
                "project" => Ok(Perspective::Project(id)),
                "context" => Ok(Perspective::Context(id)),
                _ => Err(unknown()),
            };
        }

        match lowered.as_str() {
            "today" => Ok(Perspective::Today),
            "anytime" => Ok(Perspective::Anytime),
            "flagged" => Ok(Perspective::Flagged),
            "inbox" => Ok(Perspective::Inbox),
            "completed" => Ok(Perspective::Completed),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for Perspective {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Perspective> for String {
    fn from(value: Perspective) -> Self {
        value.to_string()
    }
}

/// Knobs applied on top of the perspective rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerspectiveOptions {
    /// Drop tasks with an incomplete prerequisite.
    pub hide_blocked: bool,
}

/// Due on or before `now`'s calendar day, both read in `tz`.
pub fn is_due_today_or_overdue<Tz: TimeZone>(
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> bool {
    let due = due.with_timezone(tz);
    let now = now.with_timezone(tz);
    due.year() < now.year() || (due.year() == now.year() && due.ordinal() <= now.ordinal())
}

/// Filter with the local time zone and default options.
pub fn compute_perspective(
    tasks: &[Task],
    projects: &[Project],
    selector: Perspective,
    now: DateTime<Utc>,
) -> Vec<Task> {
    compute_perspective_in(
        tasks,
        projects,
        selector,
        now,
        &Local,
        PerspectiveOptions::default(),
    )
}

/// Filter with an explicit time zone, used for the Today calendar-day check.
pub fn compute_perspective_in<Tz: TimeZone>(
    tasks: &[Task],
    projects: &[Project],
    selector: Perspective,
    now: DateTime<Utc>,
    tz: &Tz,
    options: PerspectiveOptions,
) -> Vec<Task> {
    let availability = Availability::from_parts(tasks, projects, now);

    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| includes(task, selector, now, tz, &availability))
        .filter(|task| !options.hide_blocked || !availability.is_blocked(task.id))
        .cloned()
        .collect();

    sort_for_display(&mut visible);
    dedup_by_id(&mut visible);
    visible
}

fn includes<Tz: TimeZone>(
    task: &Task,
    selector: Perspective,
    now: DateTime<Utc>,
    tz: &Tz,
    availability: &Availability,
) -> bool {
    let open = !task.is_done() && !availability.is_deferred(task.id);

    match selector {
        Perspective::Completed => task.is_done(),
        Perspective::Anytime => open,
        Perspective::Flagged => open && task.flagged,
        Perspective::Inbox => open && task.is_unfiled(),
        Perspective::Today => {
            open && task
                .due_at
                .map_or(true, |due| is_due_today_or_overdue(due, now, tz))
        }
        Perspective::Project(id) => {
            open && task.project_id == Some(id) && availability.passes_project_gate(task)
        }
        Perspective::Context(id) => open && task.has_context(id),
    }
}

/// Manually ordered tasks first (ascending, ties by creation), then the rest
/// newest first.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| match (a.order_index, b.order_index) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)),
    });
}

fn dedup_by_id(tasks: &mut Vec<Task>) {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks.retain(|t| seen.insert(t.id));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(ValidationError::InvalidValue {
                field: "direction".into(),
                message: format!("expected up or down, got '{other}'"),
            }),
        }
    }
}

/// Order-index writes that move `task_id` one slot within `visible`.
///
/// Display positions are materialised as indices `1..=n` with the two
/// neighbours swapped; only tasks whose index actually changes are returned.
/// An empty plan means the move is a no-op (first task up, last task down,
/// or a task not in the list).
pub fn reorder(visible: &[Task], task_id: TaskId, direction: Direction) -> Vec<(TaskId, i64)> {
    let Some(pos) = visible.iter().position(|t| t.id == task_id) else {
        return Vec::new();
    };
    let other = match direction {
        Direction::Up if pos > 0 => pos - 1,
        Direction::Down if pos + 1 < visible.len() => pos + 1,
        _ => return Vec::new(),
    };

    let mut ids: Vec<TaskId> = visible.iter().map(|t| t.id).collect();
    ids.swap(pos, other);

    ids.iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let new_index = i as i64 + 1;
            let current = visible.iter().find(|t| t.id == *id)?.order_index;
            (current != Some(new_index)).then_some((*id, new_index))
        })
        .collect()
}
