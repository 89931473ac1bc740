//! Integration tests for end-to-end task workflows.
//!
//! Each test drives the public API over an in-memory database: store writes,
//! snapshot loads, perspective filtering and completion side effects.

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use nextaction_core::{
    CoreError, NewTask, Perspective, ProjectType, Recurrence, RecurrencePattern, Snapshot,
    TaskDb, TaskEngine, TaskId, TaskStatus, TaskStore, ValidationError,
};

fn engine() -> TaskEngine<TaskDb> {
    TaskEngine::new(TaskDb::open_memory().unwrap())
}

fn add(engine: &TaskEngine<TaskDb>, title: &str) -> TaskId {
    engine.store().create_task(&NewTask::new(title)).unwrap()
}

fn add_to_project(engine: &TaskEngine<TaskDb>, title: &str, project: i64) -> TaskId {
    let mut draft = NewTask::new(title);
    draft.project_id = Some(project);
    engine.store().create_task(&draft).unwrap()
}

fn view(engine: &TaskEngine<TaskDb>, perspective: Perspective) -> Vec<TaskId> {
    engine
        .perspective(perspective, Utc::now())
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect()
}

#[test]
fn test_sequential_project_workflow() {
    let engine = engine();
    let project = engine
        .store()
        .create_project("Renovate kitchen", ProjectType::Sequential)
        .unwrap();
    let t1 = add_to_project(&engine, "Measure", project);
    let t2 = add_to_project(&engine, "Order cabinets", project);
    let t3 = add_to_project(&engine, "Install", project);

    assert_eq!(view(&engine, Perspective::Project(project)), vec![t1]);

    engine.complete_task(t1).unwrap();
    assert_eq!(view(&engine, Perspective::Project(project)), vec![t2]);

    engine.complete_task(t2).unwrap();
    engine.complete_task(t3).unwrap();
    assert!(view(&engine, Perspective::Project(project)).is_empty());
    assert_eq!(view(&engine, Perspective::Completed).len(), 3);
}

#[test]
fn test_parallel_project_shows_all_open_tasks() {
    let engine = engine();
    let project = engine
        .store()
        .create_project("Errands", ProjectType::Parallel)
        .unwrap();
    let t1 = add_to_project(&engine, "Bank", project);
    let t2 = add_to_project(&engine, "Post office", project);
    let t3 = add_to_project(&engine, "Pharmacy", project);
    engine.complete_task(t2).unwrap();

    let mut visible = view(&engine, Perspective::Project(project));
    visible.sort();
    assert_eq!(visible, vec![t1, t3]);
}

#[test]
fn test_switching_project_type_changes_visibility() {
    let engine = engine();
    let project = engine
        .store()
        .create_project("Trip", ProjectType::Parallel)
        .unwrap();
    let t1 = add_to_project(&engine, "Book flights", project);
    add_to_project(&engine, "Book hotel", project);
    assert_eq!(view(&engine, Perspective::Project(project)).len(), 2);

    engine
        .store()
        .update_project_type(project, ProjectType::Sequential)
        .unwrap();
    assert_eq!(view(&engine, Perspective::Project(project)), vec![t1]);
}

#[test]
fn test_recurring_task_workflow() {
    let engine = engine();
    let mut draft = NewTask::new("Weekly review");
    draft.notes = "inbox zero, calendar, projects".into();
    draft.recurrence = Recurrence::daily();
    let id = engine.store().create_task(&draft).unwrap();

    let outcome = engine.complete_task(id).unwrap();
    let successor = outcome.successor.expect("successor created");
    assert_ne!(successor, id);

    let tasks = engine.store().load_all_tasks().unwrap();
    assert_eq!(tasks.len(), 2);
    let next = tasks.iter().find(|t| t.id == successor).unwrap();
    assert_eq!(next.title, "Weekly review");
    assert_eq!(next.notes, "inbox zero, calendar, projects");
    assert_eq!(next.recurrence, Recurrence::daily());
    assert_eq!(next.status, TaskStatus::Inbox);
    assert_eq!(view(&engine, Perspective::Inbox), vec![successor]);
}

#[test]
fn test_recurrence_interval_is_preserved() {
    let engine = engine();
    let mut draft = NewTask::new("Change filter");
    draft.recurrence = Recurrence::new(RecurrencePattern::Monthly, 3).unwrap();
    let id = engine.store().create_task(&draft).unwrap();

    let successor = engine.complete_task(id).unwrap().successor.unwrap();
    let next = engine.store().get_task(successor).unwrap();
    assert_eq!(next.recurrence.pattern, RecurrencePattern::Monthly);
    assert_eq!(next.recurrence.interval, 3);
}

#[test]
fn test_dependency_chain_workflow() {
    let engine = engine();
    let t1 = add(&engine, "Draft");
    let t2 = add(&engine, "Review");
    let t3 = add(&engine, "Revise");
    let t4 = add(&engine, "Publish");
    engine.store().add_dependency(t2, t1).unwrap();
    engine.store().add_dependency(t3, t2).unwrap();
    engine.store().add_dependency(t4, t3).unwrap();

    assert!(!engine.is_task_blocked(t1).unwrap());
    assert!(engine.is_task_blocked(t2).unwrap());
    assert!(engine.is_task_blocked(t3).unwrap());
    assert!(engine.is_task_blocked(t4).unwrap());

    engine.complete_task(t1).unwrap();
    assert!(!engine.is_task_blocked(t2).unwrap());
    assert!(engine.is_task_blocked(t3).unwrap());

    let err = engine.store().add_dependency(t1, t4).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::DependencyCycle { .. })
    ));
}

#[test]
fn test_deleting_prerequisite_clears_dependents() {
    let engine = engine();
    let prerequisite = add(&engine, "Get quote");
    let dependent = add(&engine, "Sign contract");
    engine.store().add_dependency(dependent, prerequisite).unwrap();

    engine.store().delete_task(prerequisite).unwrap();

    assert!(engine
        .store()
        .get_task_dependencies(dependent)
        .unwrap()
        .is_empty());
    assert!(!engine.is_task_blocked(dependent).unwrap());
}

#[test]
fn test_project_deletion_workflow() {
    let engine = engine();
    let project = engine
        .store()
        .create_project("Side project", ProjectType::Sequential)
        .unwrap();
    let t1 = add_to_project(&engine, "Sketch", project);
    let t2 = add_to_project(&engine, "Prototype", project);

    engine.store().delete_project(project).unwrap();

    let snapshot = Snapshot::load(engine.store()).unwrap();
    assert!(snapshot.projects.is_empty());
    assert_eq!(snapshot.tasks.len(), 2);
    assert!(snapshot.tasks.iter().all(|t| t.is_unfiled()));

    let mut inbox = view(&engine, Perspective::Inbox);
    inbox.sort();
    assert_eq!(inbox, vec![t1, t2]);
}

#[test]
fn test_order_index_workflow() {
    let engine = engine();
    let t1 = add(&engine, "First");
    let t2 = add(&engine, "Second");
    let t3 = add(&engine, "Third");
    engine.store().update_task_order_index(t1, Some(1)).unwrap();
    engine.store().update_task_order_index(t2, Some(2)).unwrap();
    engine.store().update_task_order_index(t3, Some(3)).unwrap();

    // Swap the first two.
    engine.store().update_task_order_index(t1, Some(2)).unwrap();
    engine.store().update_task_order_index(t2, Some(1)).unwrap();

    let ordered = engine.perspective(Perspective::Anytime, Utc::now()).unwrap();
    let indices: Vec<Option<i64>> = ordered.iter().map(|t| t.order_index).collect();
    assert_eq!(indices, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(ordered[0].id, t2);
}

#[test]
fn test_today_perspective_due_dates() {
    let engine = engine();
    let undated = add(&engine, "Undated");
    let now = Utc::now();

    let mut due_now = NewTask::new("Due now");
    due_now.due_at = Some(now);
    let due_now = engine.store().create_task(&due_now).unwrap();

    let mut due_tomorrow = NewTask::new("Due tomorrow");
    due_tomorrow.due_at = Some(now + Duration::days(1));
    let due_tomorrow = engine.store().create_task(&due_tomorrow).unwrap();

    let today = view(&engine, Perspective::Today);
    assert!(today.contains(&undated));
    assert!(today.contains(&due_now));
    assert!(!today.contains(&due_tomorrow));
    assert!(view(&engine, Perspective::Anytime).contains(&due_tomorrow));
}

#[test]
fn test_deferred_task_is_hidden_until_defer_date() {
    let engine = engine();
    let mut draft = NewTask::new("Renew passport");
    draft.flagged = true;
    draft.defer_at = Some(Utc::now() + Duration::hours(2));
    let id = engine.store().create_task(&draft).unwrap();

    for perspective in [
        Perspective::Today,
        Perspective::Anytime,
        Perspective::Flagged,
        Perspective::Inbox,
        Perspective::Completed,
    ] {
        assert!(!view(&engine, perspective).contains(&id), "{perspective}");
    }

    let later = Utc::now() + Duration::hours(3);
    let visible = engine.perspective(Perspective::Flagged, later).unwrap();
    assert_eq!(visible.len(), 1);
}

#[test]
fn test_quick_capture_workflow() {
    let engine = engine();
    let now = FixedOffset::east_opt(-5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 11, 3, 18, 45, 0)
        .unwrap();

    let task = engine
        .capture_at("Buy milk @errands #tomorrow !flag", now)
        .unwrap();

    assert_eq!(task.title, "Buy milk");
    assert!(task.flagged);
    // Midnight of Nov 4 at UTC-5.
    assert_eq!(
        task.defer_at,
        Some(Utc.with_ymd_and_hms(2025, 11, 4, 5, 0, 0).unwrap())
    );
    let snapshot = Snapshot::load(engine.store()).unwrap();
    assert_eq!(snapshot.context_names(&task), vec!["errands".to_string()]);

    // A second capture reuses the context instead of creating a duplicate.
    let again = engine.capture_at("Stamps @Errands", now).unwrap();
    assert_eq!(again.context_ids, task.context_ids);
    assert_eq!(engine.store().load_all_contexts().unwrap().len(), 1);

    let ctx = task.context_ids[0];
    assert_eq!(
        engine
            .perspective(Perspective::Context(ctx), Utc::now())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_batch_operations_workflow() {
    let engine = engine();
    let ids: Vec<TaskId> = ["one", "two", "three"]
        .iter()
        .map(|title| add(&engine, title))
        .collect();

    engine.set_flagged_many(&ids, true).unwrap();
    assert_eq!(view(&engine, Perspective::Flagged).len(), 3);

    let (report, _) = engine.complete_many(&ids[..2]).unwrap();
    assert_eq!(report.applied.len(), 2);
    assert_eq!(view(&engine, Perspective::Completed).len(), 2);

    engine.delete_many(&ids).unwrap();
    assert!(engine.store().load_all_tasks().unwrap().is_empty());
}
