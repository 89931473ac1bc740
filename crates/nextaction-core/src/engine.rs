//! Task engine: the pure components wired to a [`TaskStore`].

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::capture::{parse_at, CaptureDraft};
use crate::context::DEFAULT_CONTEXT_COLOR;
use crate::error::{CoreError, Result, ValidationError};
use crate::perspective::{compute_perspective_in, reorder, Direction, Perspective, PerspectiveOptions};
use crate::recurrence::{expand_recurrence, DatePolicy};
use crate::snapshot::Snapshot;
use crate::storage::Config;
use crate::store::TaskStore;
use crate::task::{ContextId, Task, TaskId, TaskStatus};

/// Result of completing a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub task_id: TaskId,
    /// Id of the next occurrence when the task recurs.
    pub successor: Option<TaskId>,
    /// Set when the task was completed but its successor could not be created.
    pub warning: Option<String>,
}

/// Per-id outcome of a batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub applied: Vec<TaskId>,
    /// Ids that no longer exist; skipped rather than failing the batch.
    pub missing: Vec<TaskId>,
}

/// Engine over a task store.
pub struct TaskEngine<S: TaskStore> {
    store: S,
    date_policy: DatePolicy,
    context_color: String,
    options: PerspectiveOptions,
}

impl<S: TaskStore> TaskEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            date_policy: DatePolicy::default(),
            context_color: DEFAULT_CONTEXT_COLOR.to_string(),
            options: PerspectiveOptions::default(),
        }
    }

    pub fn with_config(store: S, config: &Config) -> Self {
        Self {
            store,
            date_policy: config.recurrence.date_policy,
            context_color: config.capture.default_context_color.clone(),
            options: config.perspective_options(),
        }
    }

    pub fn with_date_policy(mut self, policy: DatePolicy) -> Self {
        self.date_policy = policy;
        self
    }

    pub fn with_options(mut self, options: PerspectiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::load(&self.store)
    }

    /// Visible tasks for `selector` at `now`, local time zone.
    pub fn perspective(&self, selector: Perspective, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let snapshot = self.snapshot()?;
        Ok(self.perspective_of(&snapshot, selector, now))
    }

    /// Same as [`Self::perspective`] over an already loaded snapshot.
    pub fn perspective_of(
        &self,
        snapshot: &Snapshot,
        selector: Perspective,
        now: DateTime<Utc>,
    ) -> Vec<Task> {
        compute_perspective_in(
            &snapshot.tasks,
            &snapshot.projects,
            selector,
            now,
            &Local,
            self.options,
        )
    }

    /// True when any direct prerequisite still exists and is not done.
    pub fn is_task_blocked(&self, task_id: TaskId) -> Result<bool> {
        let task = self.store.get_task(task_id)?;
        for dep_id in &task.dependency_ids {
            match self.store.get_task(*dep_id) {
                Ok(dep) if !dep.is_done() => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// Open prerequisites of a task, for display.
    pub fn blocking_tasks(&self, task_id: TaskId) -> Result<Vec<Task>> {
        let task = self.store.get_task(task_id)?;
        let mut blocking = Vec::new();
        for dep_id in &task.dependency_ids {
            match self.store.get_task(*dep_id) {
                Ok(dep) if !dep.is_done() => blocking.push(dep),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(blocking)
    }

    /// Mark a task done and, if it recurs, create its next occurrence.
    ///
    /// Completing an already-done task is a no-op. A failure while creating
    /// the successor does not undo the completion; it is reported in
    /// [`CompletionOutcome::warning`].
    pub fn complete_task(&self, task_id: TaskId) -> Result<CompletionOutcome> {
        let mut task = self.store.get_task(task_id)?;
        if task.is_done() {
            return Ok(CompletionOutcome {
                task_id,
                successor: None,
                warning: None,
            });
        }

        self.store.update_task_status(task_id, TaskStatus::Done)?;
        task.status = TaskStatus::Done;
        info!(task_id, "task completed");

        match expand_recurrence(&self.store, &task, self.date_policy) {
            Ok(successor) => Ok(CompletionOutcome {
                task_id,
                successor,
                warning: None,
            }),
            Err(e) => {
                warn!(task_id, error = %e, "failed to create next occurrence");
                Ok(CompletionOutcome {
                    task_id,
                    successor: None,
                    warning: Some(format!("task completed, but next occurrence was not created: {e}")),
                })
            }
        }
    }

    /// Move a done task back to the inbox.
    pub fn reopen_task(&self, task_id: TaskId) -> Result<()> {
        self.store.update_task_status(task_id, TaskStatus::Inbox)
    }

    /// Map context names to ids, creating the ones the store lacks with the
    /// configured default colour.
    pub fn resolve_contexts(&self, names: &[String]) -> Result<Vec<ContextId>> {
        let mut known = self.store.load_all_contexts()?;
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            let id = match known.iter().find(|c| c.matches_name(name)) {
                Some(existing) => existing.id,
                None => {
                    let id = self.store.create_context(name, &self.context_color)?;
                    info!(context_id = id, name = %name, "context created from capture");
                    known = self.store.load_all_contexts()?;
                    id
                }
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Quick capture against the local clock.
    pub fn capture(&self, input: &str) -> Result<Task> {
        self.capture_at(input, Local::now())
    }

    /// Parse a capture line, resolve its contexts and create the task.
    pub fn capture_at<Tz: TimeZone>(&self, input: &str, now: DateTime<Tz>) -> Result<Task> {
        let draft: CaptureDraft = parse_at(input, now);
        if draft.title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let context_ids = self.resolve_contexts(&draft.context_names)?;
        let task_id = self.store.create_task(&draft.to_new_task())?;
        for context_id in context_ids {
            self.store.add_context_to_task(task_id, context_id)?;
        }
        info!(task_id, "task captured");
        self.store.get_task(task_id)
    }

    /// Move a task one slot within `selector`'s current ordering.
    ///
    /// Returns false when the move was a no-op.
    pub fn move_task(
        &self,
        selector: Perspective,
        task_id: TaskId,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let visible = self.perspective(selector, now)?;
        if !visible.iter().any(|t| t.id == task_id) {
            // Surface a stale id as NotFound, otherwise report "not in this view".
            self.store.get_task(task_id)?;
            return Err(CoreError::Custom(format!(
                "task {task_id} is not visible in {selector}"
            )));
        }

        let plan = reorder(&visible, task_id, direction);
        for (id, index) in &plan {
            self.store.update_task_order_index(*id, Some(*index))?;
        }
        Ok(!plan.is_empty())
    }

    fn for_each_existing(
        &self,
        ids: &[TaskId],
        mut op: impl FnMut(TaskId) -> Result<()>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for &id in ids {
            match op(id) {
                Ok(()) => report.applied.push(id),
                Err(e) if e.is_not_found() => {
                    warn!(task_id = id, "skipping missing task in batch");
                    report.missing.push(id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    pub fn complete_many(&self, ids: &[TaskId]) -> Result<(BatchReport, Vec<CompletionOutcome>)> {
        let mut outcomes = Vec::new();
        let report = self.for_each_existing(ids, |id| {
            outcomes.push(self.complete_task(id)?);
            Ok(())
        })?;
        Ok((report, outcomes))
    }

    pub fn set_flagged_many(&self, ids: &[TaskId], flagged: bool) -> Result<BatchReport> {
        self.for_each_existing(ids, |id| self.store.update_task_flagged(id, flagged))
    }

    pub fn delete_many(&self, ids: &[TaskId]) -> Result<BatchReport> {
        self.for_each_existing(ids, |id| self.store.delete_task(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectType;
    use crate::storage::TaskDb;
    use crate::task::{NewTask, Recurrence};
    use chrono::{Duration, FixedOffset};

    fn engine() -> TaskEngine<TaskDb> {
        TaskEngine::new(TaskDb::open_memory().unwrap())
    }

    fn add(engine: &TaskEngine<TaskDb>, title: &str) -> TaskId {
        engine.store().create_task(&NewTask::new(title)).unwrap()
    }

    #[test]
    fn completing_daily_task_creates_one_successor() {
        let engine = engine();
        let ctx = engine.store().create_context("home", "#808080").unwrap();
        let mut draft = NewTask::new("Stretch");
        draft.notes = "ten minutes".into();
        draft.recurrence = Recurrence::daily();
        draft.flagged = true;
        let id = engine.store().create_task(&draft).unwrap();
        engine.store().add_context_to_task(id, ctx).unwrap();

        let outcome = engine.complete_task(id).unwrap();
        let successor_id = outcome.successor.unwrap();
        assert_ne!(successor_id, id);
        assert_eq!(outcome.warning, None);

        let tasks = engine.store().load_all_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        let successor = engine.store().get_task(successor_id).unwrap();
        assert_eq!(successor.title, "Stretch");
        assert_eq!(successor.notes, "ten minutes");
        assert_eq!(successor.recurrence, Recurrence::daily());
        assert_eq!(successor.status, TaskStatus::Inbox);
        assert!(!successor.flagged);
        assert_eq!(successor.context_ids, vec![ctx]);
        assert!(engine.store().get_task(id).unwrap().is_done());
    }

    /// Store whose inserts of recurring drafts always fail.
    struct NoSuccessors(TaskDb);

    impl TaskStore for NoSuccessors {
        fn load_all_tasks(&self) -> Result<Vec<Task>> {
            self.0.load_all_tasks()
        }
        fn load_all_projects(&self) -> Result<Vec<crate::project::Project>> {
            self.0.load_all_projects()
        }
        fn load_all_contexts(&self) -> Result<Vec<crate::context::Context>> {
            self.0.load_all_contexts()
        }
        fn get_task(&self, id: TaskId) -> Result<Task> {
            self.0.get_task(id)
        }
        fn get_project(&self, id: crate::task::ProjectId) -> Result<crate::project::Project> {
            self.0.get_project(id)
        }
        fn get_task_contexts(&self, id: TaskId) -> Result<Vec<ContextId>> {
            self.0.get_task_contexts(id)
        }
        fn get_task_dependencies(&self, id: TaskId) -> Result<Vec<TaskId>> {
            self.0.get_task_dependencies(id)
        }
        fn create_task(&self, draft: &NewTask) -> Result<TaskId> {
            if draft.recurrence.is_recurring() {
                return Err(CoreError::Custom("disk full".into()));
            }
            self.0.create_task(draft)
        }
        fn update_task_title(&self, id: TaskId, title: &str) -> Result<()> {
            self.0.update_task_title(id, title)
        }
        fn update_task_notes(&self, id: TaskId, notes: &str) -> Result<()> {
            self.0.update_task_notes(id, notes)
        }
        fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<()> {
            self.0.update_task_status(id, status)
        }
        fn update_task_defer_at(&self, id: TaskId, at: Option<DateTime<Utc>>) -> Result<()> {
            self.0.update_task_defer_at(id, at)
        }
        fn update_task_due_at(&self, id: TaskId, at: Option<DateTime<Utc>>) -> Result<()> {
            self.0.update_task_due_at(id, at)
        }
        fn update_task_flagged(&self, id: TaskId, flagged: bool) -> Result<()> {
            self.0.update_task_flagged(id, flagged)
        }
        fn update_task_order_index(&self, id: TaskId, index: Option<i64>) -> Result<()> {
            self.0.update_task_order_index(id, index)
        }
        fn update_task_recurrence(&self, id: TaskId, recurrence: Recurrence) -> Result<()> {
            self.0.update_task_recurrence(id, recurrence)
        }
        fn assign_task_to_project(
            &self,
            id: TaskId,
            project_id: Option<crate::task::ProjectId>,
        ) -> Result<()> {
            self.0.assign_task_to_project(id, project_id)
        }
        fn delete_task(&self, id: TaskId) -> Result<()> {
            self.0.delete_task(id)
        }
        fn add_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()> {
            self.0.add_dependency(task_id, depends_on)
        }
        fn remove_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()> {
            self.0.remove_dependency(task_id, depends_on)
        }
        fn add_context_to_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()> {
            self.0.add_context_to_task(task_id, context_id)
        }
        fn remove_context_from_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()> {
            self.0.remove_context_from_task(task_id, context_id)
        }
        fn create_project(
            &self,
            title: &str,
            project_type: ProjectType,
        ) -> Result<crate::task::ProjectId> {
            self.0.create_project(title, project_type)
        }
        fn update_project_title(&self, id: crate::task::ProjectId, title: &str) -> Result<()> {
            self.0.update_project_title(id, title)
        }
        fn update_project_type(
            &self,
            id: crate::task::ProjectId,
            project_type: ProjectType,
        ) -> Result<()> {
            self.0.update_project_type(id, project_type)
        }
        fn delete_project(&self, id: crate::task::ProjectId) -> Result<()> {
            self.0.delete_project(id)
        }
        fn create_context(&self, name: &str, color: &str) -> Result<ContextId> {
            self.0.create_context(name, color)
        }
        fn delete_context(&self, id: ContextId) -> Result<()> {
            self.0.delete_context(id)
        }
    }

    #[test]
    fn failed_expansion_still_completes_task() {
        let db = TaskDb::open_memory().unwrap();
        let mut draft = NewTask::new("Take out bins");
        draft.recurrence = Recurrence::daily();
        let id = db.create_task(&draft).unwrap();

        let engine = TaskEngine::new(NoSuccessors(db));
        let outcome = engine.complete_task(id).unwrap();

        assert_eq!(outcome.task_id, id);
        assert_eq!(outcome.successor, None);
        let warning = outcome.warning.unwrap();
        assert!(warning.contains("next occurrence was not created"), "{warning}");
        assert!(warning.contains("disk full"));

        assert!(engine.store().get_task(id).unwrap().is_done());
        assert_eq!(engine.store().load_all_tasks().unwrap().len(), 1);
    }

    #[test]
    fn completing_twice_does_not_duplicate_successor() {
        let engine = engine();
        let mut draft = NewTask::new("Journal");
        draft.recurrence = Recurrence::daily();
        let id = engine.store().create_task(&draft).unwrap();

        engine.complete_task(id).unwrap();
        let again = engine.complete_task(id).unwrap();
        assert_eq!(again.successor, None);
        assert_eq!(engine.store().load_all_tasks().unwrap().len(), 2);
    }

    #[test]
    fn completing_missing_task_is_not_found() {
        assert!(engine().complete_task(5).unwrap_err().is_not_found());
    }

    #[test]
    fn advance_policy_moves_dates() {
        let engine = engine().with_date_policy(DatePolicy::Advance);
        let due = Utc::now() + Duration::days(1);
        let mut draft = NewTask::new("Pay rent");
        draft.recurrence = Recurrence::new(crate::task::RecurrencePattern::Weekly, 1).unwrap();
        draft.due_at = Some(due);
        let id = engine.store().create_task(&draft).unwrap();

        let successor = engine.complete_task(id).unwrap().successor.unwrap();
        let due_next = engine.store().get_task(successor).unwrap().due_at.unwrap();
        assert_eq!(due_next - due, Duration::weeks(1));
    }

    #[test]
    fn blocked_check_follows_completion() {
        let engine = engine();
        let a = add(&engine, "a");
        let b = add(&engine, "b");
        engine.store().add_dependency(b, a).unwrap();

        assert!(engine.is_task_blocked(b).unwrap());
        assert!(!engine.is_task_blocked(a).unwrap());
        assert_eq!(engine.blocking_tasks(b).unwrap()[0].id, a);

        engine.complete_task(a).unwrap();
        assert!(!engine.is_task_blocked(b).unwrap());
    }

    #[test]
    fn capture_resolves_and_reuses_contexts() {
        let engine = engine();
        let existing = engine.store().create_context("Errands", "#ff0000").unwrap();
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 11, 10, 0, 0)
            .unwrap();

        let task = engine
            .capture_at("Buy milk @errands @shop #tomorrow !flag", now)
            .unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(task.flagged);
        assert_eq!(
            task.defer_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap())
        );
        assert_eq!(task.context_ids.len(), 2);
        assert!(task.context_ids.contains(&existing));

        let contexts = engine.store().load_all_contexts().unwrap();
        let shop = contexts.iter().find(|c| c.name == "shop").unwrap();
        assert_eq!(shop.color, DEFAULT_CONTEXT_COLOR);
    }

    #[test]
    fn capture_rejects_blank_input() {
        assert!(matches!(
            engine().capture("   "),
            Err(CoreError::Validation(ValidationError::EmptyTitle))
        ));
    }

    #[test]
    fn move_task_reorders_view() {
        let engine = engine();
        let a = add(&engine, "a");
        let b = add(&engine, "b");
        let c = add(&engine, "c");
        let now = Utc::now() + Duration::seconds(1);

        let before: Vec<TaskId> = engine
            .perspective(Perspective::Anytime, now)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(before, vec![c, b, a]);

        assert!(engine.move_task(Perspective::Anytime, a, Direction::Up, now).unwrap());
        let after: Vec<TaskId> = engine
            .perspective(Perspective::Anytime, now)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(after, vec![c, a, b]);

        assert!(!engine.move_task(Perspective::Anytime, c, Direction::Up, now).unwrap());
        assert!(engine
            .move_task(Perspective::Anytime, 99, Direction::Up, now)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn batch_operations_skip_missing_ids() {
        let engine = engine();
        let a = add(&engine, "a");
        let b = add(&engine, "b");

        let report = engine.set_flagged_many(&[a, 42, b], true).unwrap();
        assert_eq!(report.applied, vec![a, b]);
        assert_eq!(report.missing, vec![42]);

        let (report, outcomes) = engine.complete_many(&[a]).unwrap();
        assert_eq!(report.applied, vec![a]);
        assert_eq!(outcomes.len(), 1);

        let report = engine.delete_many(&[a, b]).unwrap();
        assert_eq!(report.applied.len(), 2);
        assert!(engine.store().load_all_tasks().unwrap().is_empty());
    }

    #[test]
    fn sequential_project_view_advances() {
        let engine = engine();
        let p = engine
            .store()
            .create_project("Launch", ProjectType::Sequential)
            .unwrap();
        let ids: Vec<TaskId> = (1..=3)
            .map(|i| {
                let mut draft = NewTask::new(format!("step {i}"));
                draft.project_id = Some(p);
                engine.store().create_task(&draft).unwrap()
            })
            .collect();
        let now = Utc::now() + Duration::seconds(1);

        let view = engine.perspective(Perspective::Project(p), now).unwrap();
        assert_eq!(view.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[0]]);

        engine.complete_task(ids[0]).unwrap();
        let view = engine.perspective(Perspective::Project(p), now).unwrap();
        assert_eq!(view.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[1]]);
    }
}
