//! Batch selection and the operations applied to it.

use chrono::Utc;
use clap::Subcommand;
use std::error::Error;
use std::path::Path;

use nextaction_core::{
    Availability, BatchReport, Task, TaskDb, TaskEngine, TaskId, TaskStore, ViewState,
};

use super::{open_engine, print_json, task_line, CliResult};

#[derive(Subcommand)]
pub enum SelectAction {
    /// Add tasks to the selection (default: the task under the cursor)
    Add {
        ids: Vec<TaskId>,
    },
    /// Remove tasks from the selection
    Remove {
        #[arg(required = true)]
        ids: Vec<TaskId>,
    },
    /// Empty the selection
    Clear,
    /// Show selected tasks
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Move the cursor to a row of the current view
    Cursor {
        row: usize,
    },
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Complete every selected task, then clear the selection
    Complete,
    /// Flag every selected task
    Flag,
    /// Unflag every selected task
    Unflag,
    /// Delete every selected task, then clear the selection
    Delete,
}

fn current_view(engine: &TaskEngine<TaskDb>, state: &ViewState) -> Result<Vec<Task>, Box<dyn Error>> {
    let selector = state.perspective.unwrap_or_default();
    Ok(engine.perspective(selector, Utc::now())?)
}

pub fn run(db: Option<&Path>, action: SelectAction) -> CliResult {
    let engine = open_engine(db)?;
    let store = engine.store();
    let mut state = ViewState::load(store)?;

    match action {
        SelectAction::Add { ids } => {
            let ids = if ids.is_empty() {
                let visible = current_view(&engine, &state)?;
                let task = state
                    .task_at_cursor(&visible)
                    .ok_or("nothing under the cursor; run `nextaction list` first")?;
                vec![task.id]
            } else {
                ids
            };
            for id in ids {
                store.get_task(id)?;
                state.select(id);
            }
            println!("{} selected", state.selection.len());
        }
        SelectAction::Remove { ids } => {
            for id in ids {
                state.deselect(id);
            }
            println!("{} selected", state.selection.len());
        }
        SelectAction::Clear => {
            state.clear_selection();
            println!("selection cleared");
        }
        SelectAction::Show { json } => {
            let snapshot = engine.snapshot()?;
            state.prune(&snapshot.tasks);
            let selected: Vec<_> = snapshot
                .tasks
                .iter()
                .filter(|t| state.selection.contains(&t.id))
                .cloned()
                .collect();
            if json {
                print_json(&selected)?;
            } else {
                let availability = Availability::compute(&snapshot, Utc::now());
                for task in &selected {
                    println!("{}", task_line(task, &snapshot, availability.is_blocked(task.id)));
                }
                println!("{} selected", selected.len());
            }
        }
        SelectAction::Cursor { row } => {
            let visible = current_view(&engine, &state)?;
            state.cursor = row;
            state.clamp_cursor(visible.len());
            match state.task_at_cursor(&visible) {
                Some(task) => println!("cursor at {}: {}", state.cursor, task.title),
                None => println!("view is empty"),
            }
        }
    }

    state.save(store)?;
    Ok(())
}

fn print_report(verb: &str, report: &BatchReport) {
    println!("{verb} {} task(s)", report.applied.len());
    if !report.missing.is_empty() {
        let missing: Vec<String> = report.missing.iter().map(|id| id.to_string()).collect();
        eprintln!("warning: skipped missing task(s): {}", missing.join(", "));
    }
}

pub fn run_batch(db: Option<&Path>, action: BatchAction) -> CliResult {
    let engine = open_engine(db)?;
    let store = engine.store();
    let mut state = ViewState::load(store)?;
    let ids = state.selected();
    if ids.is_empty() {
        return Err("selection is empty; use `nextaction select add` first".into());
    }

    match action {
        BatchAction::Complete => {
            let (report, outcomes) = engine.complete_many(&ids)?;
            print_report("Completed", &report);
            for outcome in outcomes {
                if let Some(next) = outcome.successor {
                    println!("Next occurrence of {}: {next}", outcome.task_id);
                }
                if let Some(warning) = outcome.warning {
                    eprintln!("warning: {warning}");
                }
            }
            state.clear_selection();
        }
        BatchAction::Flag => print_report("Flagged", &engine.set_flagged_many(&ids, true)?),
        BatchAction::Unflag => print_report("Unflagged", &engine.set_flagged_many(&ids, false)?),
        BatchAction::Delete => {
            print_report("Deleted", &engine.delete_many(&ids)?);
            state.clear_selection();
        }
    }

    state.save(store)?;
    Ok(())
}
