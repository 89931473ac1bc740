//! A point-in-time copy of every entity the filters look at.

use crate::context::Context;
use crate::error::Result;
use crate::project::Project;
use crate::store::TaskStore;
use crate::task::{ContextId, ProjectId, Task, TaskId};

/// Tasks, projects and contexts loaded in one refresh.
///
/// The filters never mutate a snapshot, so one load can feed any number of
/// perspective computations.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub contexts: Vec<Context>,
}

impl Snapshot {
    pub fn load<S: TaskStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            tasks: store.load_all_tasks()?,
            projects: store.load_all_projects()?,
            contexts: store.load_all_contexts()?,
        })
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.iter().find(|c| c.id == id)
    }

    pub fn context_by_name(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.matches_name(name))
    }

    /// Display names of a task's contexts, in id order; dangling ids are skipped.
    pub fn context_names(&self, task: &Task) -> Vec<String> {
        task.context_ids
            .iter()
            .filter_map(|id| self.context(*id))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn project_title(&self, task: &Task) -> Option<&str> {
        task.project_id
            .and_then(|id| self.project(id))
            .map(|p| p.title.as_str())
    }
}
