//! Deferred and blocked state for tasks, and the visible head of sequential
//! projects.
//!
//! Every function here is pure: inputs are borrowed, nothing is written back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::project::{Project, ProjectType};
use crate::snapshot::Snapshot;
use crate::task::{ProjectId, Task, TaskId, TaskStatus};

/// True when the task has a defer date strictly in the future.
pub fn is_deferred(task: &Task, now: DateTime<Utc>) -> bool {
    task.defer_at.is_some_and(|defer| defer > now)
}

/// True when at least one direct prerequisite is present and not done.
///
/// Dependencies are not followed transitively, and ids missing from
/// `all_tasks` are ignored.
pub fn is_blocked(task: &Task, all_tasks: &[Task]) -> bool {
    task.dependency_ids.iter().any(|dep_id| {
        all_tasks
            .iter()
            .find(|t| t.id == *dep_id)
            .is_some_and(|dep| !dep.is_done())
    })
}

/// The one task a sequential project exposes: its earliest-created
/// incomplete task, ties broken by id.
pub fn sequential_visible_task(project_id: ProjectId, tasks: &[Task]) -> Option<TaskId> {
    tasks
        .iter()
        .filter(|t| t.project_id == Some(project_id) && !t.is_done())
        .min_by_key(|t| (t.created_at, t.id))
        .map(|t| t.id)
}

/// Project type lookup; an id with no matching project counts as sequential.
pub fn project_type_of(project_id: ProjectId, projects: &[Project]) -> ProjectType {
    projects
        .iter()
        .find(|p| p.id == project_id)
        .map(|p| p.project_type)
        .unwrap_or_default()
}

/// Per-task flags computed by [`Availability::compute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskAvailability {
    pub deferred: bool,
    pub blocked: bool,
}

/// Availability of a whole snapshot, computed once per refresh.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    tasks: HashMap<TaskId, TaskAvailability>,
    heads: HashMap<ProjectId, Option<TaskId>>,
    project_types: HashMap<ProjectId, ProjectType>,
}

impl Availability {
    pub fn compute(snapshot: &Snapshot, now: DateTime<Utc>) -> Self {
        Self::from_parts(&snapshot.tasks, &snapshot.projects, now)
    }

    pub fn from_parts(tasks: &[Task], projects: &[Project], now: DateTime<Utc>) -> Self {
        let status_by_id: HashMap<TaskId, TaskStatus> =
            tasks.iter().map(|t| (t.id, t.status)).collect();

        let mut per_task = HashMap::with_capacity(tasks.len());
        for task in tasks {
            let blocked = task.dependency_ids.iter().any(|dep| {
                status_by_id
                    .get(dep)
                    .is_some_and(|status| !status.is_done())
            });
            per_task.insert(
                task.id,
                TaskAvailability {
                    deferred: is_deferred(task, now),
                    blocked,
                },
            );
        }

        // Heads are only needed for projects some task actually references.
        let mut heads: HashMap<ProjectId, Option<TaskId>> = HashMap::new();
        let mut project_types = HashMap::new();
        for project_id in tasks.iter().filter_map(|t| t.project_id) {
            heads
                .entry(project_id)
                .or_insert_with(|| sequential_visible_task(project_id, tasks));
            project_types
                .entry(project_id)
                .or_insert_with(|| project_type_of(project_id, projects));
        }

        Self {
            tasks: per_task,
            heads,
            project_types,
        }
    }

    pub fn get(&self, task_id: TaskId) -> TaskAvailability {
        self.tasks.get(&task_id).copied().unwrap_or_default()
    }

    pub fn is_deferred(&self, task_id: TaskId) -> bool {
        self.get(task_id).deferred
    }

    pub fn is_blocked(&self, task_id: TaskId) -> bool {
        self.get(task_id).blocked
    }

    pub fn visible_head(&self, project_id: ProjectId) -> Option<TaskId> {
        self.heads.get(&project_id).copied().flatten()
    }

    pub fn project_type(&self, project_id: ProjectId) -> ProjectType {
        self.project_types
            .get(&project_id)
            .copied()
            .unwrap_or_default()
    }

    /// Whether project gating lets this task through: parallel projects show
    /// everything, sequential ones only their head.
    pub fn passes_project_gate(&self, task: &Task) -> bool {
        match task.project_id {
            None => true,
            Some(project_id) => match self.project_type(project_id) {
                ProjectType::Parallel => true,
                ProjectType::Sequential => self.visible_head(project_id) == Some(task.id),
            },
        }
    }
}
