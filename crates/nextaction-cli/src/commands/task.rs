//! Task management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use std::path::Path;

use nextaction_core::{
    Direction, NewTask, Perspective, Recurrence, RecurrencePattern, TaskEngine, TaskDb, TaskId,
    TaskStore, ViewState,
};

use super::{
    open_engine, parse_optional_date, parse_optional_id, print_json, report_created, task_line,
    CliResult,
};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Project ID to file the task under
        #[arg(long)]
        project: Option<i64>,
        /// Context name; may be repeated
        #[arg(long = "context", value_name = "NAME")]
        contexts: Vec<String>,
        /// Flag the task
        #[arg(long)]
        flag: bool,
        /// Hide until: today, tomorrow, weekend, YYYY-MM-DD or RFC 3339
        #[arg(long)]
        defer: Option<String>,
        /// Due date, same formats as --defer
        #[arg(long)]
        due: Option<String>,
        /// Recurrence: daily, weekly, monthly or yearly
        #[arg(long)]
        repeat: Option<String>,
        /// Recurrence interval (every N units)
        #[arg(long, default_value_t = 1)]
        every: u32,
        /// Print the created task as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show task details
    Show {
        /// Task ID
        id: TaskId,
        #[arg(long)]
        json: bool,
    },
    /// Update task fields
    Update {
        /// Task ID
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Project ID, or "none" to unfile
        #[arg(long)]
        project: Option<String>,
        /// true or false
        #[arg(long)]
        flag: Option<bool>,
        /// Date, or "none" to clear
        #[arg(long)]
        defer: Option<String>,
        /// Date, or "none" to clear
        #[arg(long)]
        due: Option<String>,
        /// none, daily, weekly, monthly or yearly
        #[arg(long)]
        repeat: Option<String>,
        /// Recurrence interval; keeps the current pattern unless --repeat is given
        #[arg(long)]
        every: Option<u32>,
        /// Manual order index, or "none" to clear
        #[arg(long)]
        order: Option<String>,
    },
    /// Mark a task done (creates the next occurrence of recurring tasks)
    Complete {
        /// Task ID
        id: TaskId,
    },
    /// Move a done task back to the inbox
    Reopen {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
    /// Move a task up or down in a perspective
    Move {
        /// Task ID
        id: TaskId,
        /// up or down
        direction: Direction,
        /// Perspective to reorder in (default: the current view)
        #[arg(long)]
        perspective: Option<Perspective>,
    },
    /// Make a task wait on another
    Depend {
        /// Dependent task ID
        id: TaskId,
        /// Prerequisite task ID
        on: TaskId,
    },
    /// Remove a dependency
    Undepend {
        id: TaskId,
        on: TaskId,
    },
    /// Attach a context by name, creating it if needed
    Tag {
        id: TaskId,
        context: String,
    },
    /// Detach a context by name
    Untag {
        id: TaskId,
        context: String,
    },
    /// Report whether a task is blocked and by what
    Blocked {
        id: TaskId,
    },
}

fn recurrence_from(repeat: &str, every: u32) -> Result<Recurrence, Box<dyn std::error::Error>> {
    let pattern: RecurrencePattern = repeat.parse()?;
    Ok(Recurrence::new(pattern, every)?)
}

pub fn run(db: Option<&Path>, action: TaskAction) -> CliResult {
    let engine = open_engine(db)?;
    let store = engine.store();

    match action {
        TaskAction::Add {
            title,
            notes,
            project,
            contexts,
            flag,
            defer,
            due,
            repeat,
            every,
            json,
        } => {
            let draft = NewTask {
                title,
                notes: notes.unwrap_or_default(),
                project_id: project,
                flagged: flag,
                defer_at: defer.as_deref().map(parse_optional_date).transpose()?.flatten(),
                due_at: due.as_deref().map(parse_optional_date).transpose()?.flatten(),
                recurrence: match repeat {
                    Some(r) => recurrence_from(&r, every)?,
                    None => Recurrence::NONE,
                },
                ..NewTask::default()
            };
            draft.validate()?;
            let context_ids = engine.resolve_contexts(&contexts)?;
            let id = store.create_task(&draft)?;
            for context_id in context_ids {
                store.add_context_to_task(id, context_id)?;
            }

            if json {
                print_json(&store.get_task(id)?)?;
            } else {
                report_created("Task", id);
            }
        }
        TaskAction::Show { id, json } => {
            let task = store.get_task(id)?;
            if json {
                return print_json(&task);
            }
            let snapshot = engine.snapshot()?;
            let blocking = engine.blocking_tasks(id)?;
            println!("{}", task_line(&task, &snapshot, !blocking.is_empty()));
            println!("  status:   {}", task.status);
            println!("  created:  {}", task.created_at.to_rfc3339());
            println!("  modified: {}", task.modified_at.to_rfc3339());
            if let Some(order) = task.order_index {
                println!("  order:    {order}");
            }
            if !task.notes.is_empty() {
                println!("  notes:    {}", task.notes);
            }
            for dep in &blocking {
                println!("  waiting on {}: {}", dep.id, dep.title);
            }
        }
        TaskAction::Update {
            id,
            title,
            notes,
            project,
            flag,
            defer,
            due,
            repeat,
            every,
            order,
        } => {
            // Look the task up first so a stale id fails before any write.
            let current = store.get_task(id)?;
            if let Some(title) = title {
                store.update_task_title(id, &title)?;
            }
            if let Some(notes) = notes {
                store.update_task_notes(id, &notes)?;
            }
            if let Some(project) = project {
                store.assign_task_to_project(id, parse_optional_id(&project)?)?;
            }
            if let Some(flag) = flag {
                store.update_task_flagged(id, flag)?;
            }
            if let Some(defer) = defer {
                store.update_task_defer_at(id, parse_optional_date(&defer)?)?;
            }
            if let Some(due) = due {
                store.update_task_due_at(id, parse_optional_date(&due)?)?;
            }
            if repeat.is_some() || every.is_some() {
                let interval = every.unwrap_or(current.recurrence.interval);
                let recurrence = match repeat {
                    Some(r) => recurrence_from(&r, interval)?,
                    None => Recurrence::new(current.recurrence.pattern, interval)?,
                };
                store.update_task_recurrence(id, recurrence)?;
            }
            if let Some(order) = order {
                store.update_task_order_index(id, parse_optional_id(&order)?)?;
            }
            println!("Task updated: {id}");
        }
        TaskAction::Complete { id } => {
            let outcome = engine.complete_task(id)?;
            println!("Task completed: {id}");
            if let Some(next) = outcome.successor {
                println!("Next occurrence: {next}");
            }
            if let Some(warning) = outcome.warning {
                eprintln!("warning: {warning}");
            }
        }
        TaskAction::Reopen { id } => {
            engine.reopen_task(id)?;
            println!("Task reopened: {id}");
        }
        TaskAction::Delete { id } => {
            store.delete_task(id)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Move {
            id,
            direction,
            perspective,
        } => run_move(&engine, id, direction, perspective)?,
        TaskAction::Depend { id, on } => {
            store.add_dependency(id, on)?;
            println!("Task {id} now waits on {on}");
        }
        TaskAction::Undepend { id, on } => {
            store.remove_dependency(id, on)?;
            println!("Task {id} no longer waits on {on}");
        }
        TaskAction::Tag { id, context } => {
            store.get_task(id)?;
            let ids = engine.resolve_contexts(std::slice::from_ref(&context))?;
            for context_id in ids {
                store.add_context_to_task(id, context_id)?;
            }
            println!("Task {id} tagged @{}", context.trim_start_matches('@'));
        }
        TaskAction::Untag { id, context } => {
            let found = store
                .find_context_by_name(&context)?
                .ok_or_else(|| format!("unknown context: {context}"))?;
            store.remove_context_from_task(id, found.id)?;
            println!("Task {id} untagged @{}", found.name);
        }
        TaskAction::Blocked { id } => {
            let blocking = engine.blocking_tasks(id)?;
            if blocking.is_empty() {
                println!("Task {id} is not blocked");
            } else {
                println!("Task {id} is blocked by:");
                for dep in blocking {
                    println!("  {} {}", dep.id, dep.title);
                }
            }
        }
    }
    Ok(())
}

fn run_move(
    engine: &TaskEngine<TaskDb>,
    id: TaskId,
    direction: Direction,
    perspective: Option<Perspective>,
) -> CliResult {
    let store = engine.store();
    let state = ViewState::load(store)?;
    let selector = perspective
        .or(state.perspective)
        .unwrap_or_default();

    if engine.move_task(selector, id, direction, Utc::now())? {
        println!("Task moved: {id}");
    } else {
        println!("Task {id} is already at the edge of {selector}");
    }
    Ok(())
}
