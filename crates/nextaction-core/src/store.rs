//! The entity store seam.
//!
//! Everything above this trait is storage-agnostic; [`crate::storage::TaskDb`]
//! is the SQLite implementation the CLI ships with.

use chrono::{DateTime, Utc};

use crate::context::Context;
use crate::error::Result;
use crate::project::{Project, ProjectType};
use crate::task::{ContextId, NewTask, ProjectId, Recurrence, Task, TaskId, TaskStatus};

/// Durable storage for tasks, projects, contexts and their relationships.
///
/// Reads of an unknown id and writes that touch zero rows return
/// [`crate::CoreError::NotFound`].
pub trait TaskStore {
    // Reads

    fn load_all_tasks(&self) -> Result<Vec<Task>>;
    fn load_all_projects(&self) -> Result<Vec<Project>>;
    fn load_all_contexts(&self) -> Result<Vec<Context>>;
    fn get_task(&self, id: TaskId) -> Result<Task>;
    fn get_project(&self, id: ProjectId) -> Result<Project>;
    fn get_task_contexts(&self, id: TaskId) -> Result<Vec<ContextId>>;
    fn get_task_dependencies(&self, id: TaskId) -> Result<Vec<TaskId>>;

    // Tasks

    /// Insert a task and return its id. `created_at` and `modified_at` are
    /// set to the insertion instant.
    fn create_task(&self, draft: &NewTask) -> Result<TaskId>;
    fn update_task_title(&self, id: TaskId, title: &str) -> Result<()>;
    fn update_task_notes(&self, id: TaskId, notes: &str) -> Result<()>;
    fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<()>;
    fn update_task_defer_at(&self, id: TaskId, defer_at: Option<DateTime<Utc>>) -> Result<()>;
    fn update_task_due_at(&self, id: TaskId, due_at: Option<DateTime<Utc>>) -> Result<()>;
    fn update_task_flagged(&self, id: TaskId, flagged: bool) -> Result<()>;
    fn update_task_order_index(&self, id: TaskId, order_index: Option<i64>) -> Result<()>;
    fn update_task_recurrence(&self, id: TaskId, recurrence: Recurrence) -> Result<()>;
    fn assign_task_to_project(&self, id: TaskId, project_id: Option<ProjectId>) -> Result<()>;
    /// Removes the task, its dependency edges in both directions, and its
    /// context associations.
    fn delete_task(&self, id: TaskId) -> Result<()>;

    // Relationships

    /// Rejects self-edges and edges that would close a cycle.
    fn add_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()>;
    fn remove_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()>;
    fn add_context_to_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()>;
    fn remove_context_from_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()>;

    // Projects

    fn create_project(&self, title: &str, project_type: ProjectType) -> Result<ProjectId>;
    fn update_project_title(&self, id: ProjectId, title: &str) -> Result<()>;
    fn update_project_type(&self, id: ProjectId, project_type: ProjectType) -> Result<()>;
    /// Member tasks are unassigned, not deleted.
    fn delete_project(&self, id: ProjectId) -> Result<()>;

    // Contexts

    fn create_context(&self, name: &str, color: &str) -> Result<ContextId>;
    fn delete_context(&self, id: ContextId) -> Result<()>;
}
