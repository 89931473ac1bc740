//! `list`: show a perspective and remember it as the current view.

use chrono::Utc;
use clap::Args;
use std::path::Path;

use nextaction_core::{Availability, Config, Perspective, TaskEngine, ViewState};

use super::{open_db, print_json, task_line, CliResult};

#[derive(Args)]
pub struct ListArgs {
    /// today, anytime, flagged, inbox, completed, project:<id> or context:<id>
    perspective: Option<String>,
    /// Print tasks as JSON
    #[arg(long)]
    json: bool,
    /// Hide tasks waiting on an unfinished prerequisite
    #[arg(long)]
    hide_blocked: bool,
}

pub fn run(db: Option<&Path>, args: ListArgs) -> CliResult {
    let config = Config::load()?;
    let db = open_db(db)?;
    let mut state = ViewState::load(&db)?;

    let perspective: Perspective = match args.perspective {
        Some(p) => p.parse()?,
        None => state.perspective.unwrap_or(config.perspective.default),
    };

    let mut options = config.perspective_options();
    options.hide_blocked |= args.hide_blocked;

    let engine = TaskEngine::with_config(db, &config).with_options(options);
    let snapshot = engine.snapshot()?;
    let now = Utc::now();
    let tasks = engine.perspective_of(&snapshot, perspective, now);

    state.set_perspective(perspective);
    state.clamp_cursor(tasks.len());
    state.prune(&snapshot.tasks);
    state.save(engine.store())?;

    if args.json {
        return print_json(&tasks);
    }

    println!("{perspective} ({})", tasks.len());
    let availability = Availability::compute(&snapshot, now);
    for (row, task) in tasks.iter().enumerate() {
        let cursor = if row == state.cursor { '>' } else { ' ' };
        let selected = if state.selection.contains(&task.id) { '*' } else { ' ' };
        println!(
            "{cursor}{selected}{}",
            task_line(task, &snapshot, availability.is_blocked(task.id))
        );
    }
    Ok(())
}
