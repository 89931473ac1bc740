//! Property checks for deferral and sequential-project gating.

use chrono::{DateTime, Duration, TimeZone, Utc};
use nextaction_core::perspective::compute_perspective_in;
use nextaction_core::{
    is_deferred, sequential_visible_task, Perspective, PerspectiveOptions, Project, ProjectType,
    Recurrence, Task, TaskStatus,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Inbox),
        Just(TaskStatus::Active),
        Just(TaskStatus::Done)
    ]
}

fn task_strategy() -> impl Strategy<Value = Task> {
    (
        status_strategy(),
        proptest::option::of(1i64..4),
        any::<bool>(),
        -500i64..500,
        proptest::option::of(-2000i64..2000),
        proptest::option::of(-3000i64..3000),
        proptest::collection::vec(1i64..40, 0..3),
    )
        .prop_map(
            |(status, project_id, flagged, created, defer, due, deps)| Task {
                id: 0,
                title: String::new(),
                notes: String::new(),
                status,
                project_id,
                flagged,
                created_at: now() + Duration::minutes(created),
                modified_at: now(),
                defer_at: defer.map(|m| now() + Duration::minutes(m)),
                due_at: due.map(|m| now() + Duration::minutes(m)),
                order_index: None,
                recurrence: Recurrence::NONE,
                context_ids: vec![],
                dependency_ids: deps,
            },
        )
}

/// Task lists with unique ids 1..=n.
fn tasks_strategy() -> impl Strategy<Value = Vec<Task>> {
    proptest::collection::vec(task_strategy(), 0..30).prop_map(|mut tasks| {
        for (i, task) in tasks.iter_mut().enumerate() {
            task.id = i as i64 + 1;
            task.title = format!("task {}", task.id);
        }
        tasks
    })
}

fn projects_strategy() -> impl Strategy<Value = Vec<Project>> {
    proptest::collection::vec(any::<bool>(), 3).prop_map(|parallel| {
        parallel
            .into_iter()
            .enumerate()
            .map(|(i, is_parallel)| Project {
                id: i as i64 + 1,
                title: format!("project {}", i + 1),
                project_type: if is_parallel {
                    ProjectType::Parallel
                } else {
                    ProjectType::Sequential
                },
                created_at: now(),
            })
            .collect()
    })
}

fn all_perspectives() -> Vec<Perspective> {
    vec![
        Perspective::Today,
        Perspective::Anytime,
        Perspective::Flagged,
        Perspective::Inbox,
        Perspective::Completed,
        Perspective::Project(1),
        Perspective::Project(2),
        Perspective::Project(3),
    ]
}

fn filter(tasks: &[Task], projects: &[Project], p: Perspective) -> Vec<Task> {
    compute_perspective_in(tasks, projects, p, now(), &Utc, PerspectiveOptions::default())
}

proptest! {
    #[test]
    fn deferred_tasks_only_surface_in_completed(
        tasks in tasks_strategy(),
        projects in projects_strategy(),
    ) {
        for p in all_perspectives() {
            for task in filter(&tasks, &projects, p) {
                if p == Perspective::Completed {
                    prop_assert!(task.is_done());
                } else {
                    prop_assert!(!is_deferred(&task, now()), "{} leaked into {}", task.id, p);
                    prop_assert!(!task.is_done());
                }
            }
        }
    }

    #[test]
    fn sequential_projects_show_at_most_their_head(
        tasks in tasks_strategy(),
        projects in projects_strategy(),
    ) {
        for project in projects.iter().filter(|p| p.project_type == ProjectType::Sequential) {
            let shown = filter(&tasks, &projects, Perspective::Project(project.id));
            prop_assert!(shown.len() <= 1);
            if let Some(task) = shown.first() {
                prop_assert_eq!(Some(task.id), sequential_visible_task(project.id, &tasks));
            }
        }
    }

    #[test]
    fn results_are_unique_and_drawn_from_input(
        tasks in tasks_strategy(),
        projects in projects_strategy(),
    ) {
        let input_ids: HashSet<i64> = tasks.iter().map(|t| t.id).collect();
        for p in all_perspectives() {
            let shown = filter(&tasks, &projects, p);
            let ids: HashSet<i64> = shown.iter().map(|t| t.id).collect();
            prop_assert_eq!(ids.len(), shown.len());
            prop_assert!(ids.is_subset(&input_ids));
        }
    }

    #[test]
    fn anytime_is_a_superset_of_narrower_views(
        tasks in tasks_strategy(),
        projects in projects_strategy(),
    ) {
        let anytime: HashSet<i64> = filter(&tasks, &projects, Perspective::Anytime)
            .iter()
            .map(|t| t.id)
            .collect();
        for p in [Perspective::Today, Perspective::Flagged, Perspective::Inbox, Perspective::Project(1)] {
            for task in filter(&tasks, &projects, p) {
                prop_assert!(anytime.contains(&task.id));
            }
        }
    }
}
