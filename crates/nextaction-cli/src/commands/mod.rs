//! Command handlers and the helpers they share.

pub mod capture;
pub mod config;
pub mod context;
pub mod export;
pub mod list;
pub mod project;
pub mod select;
pub mod task;

use chrono::{DateTime, Local, Utc};
use std::error::Error;
use std::path::Path;

use nextaction_core::capture::parse_date_input;
use nextaction_core::{Config, Snapshot, Task, TaskDb, TaskEngine, TaskId};

pub type CliResult = Result<(), Box<dyn Error>>;

/// Open the database at `--db` or the default location.
pub fn open_db(db: Option<&Path>) -> Result<TaskDb, Box<dyn Error>> {
    let db = match db {
        Some(path) => TaskDb::open_at(path)?,
        None => TaskDb::open()?,
    };
    Ok(db)
}

/// Engine configured from `config.toml`.
pub fn open_engine(db: Option<&Path>) -> Result<TaskEngine<TaskDb>, Box<dyn Error>> {
    let config = Config::load()?;
    Ok(TaskEngine::with_config(open_db(db)?, &config))
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a `--defer`/`--due` argument; `none` clears the date.
pub fn parse_optional_date(input: &str) -> Result<Option<DateTime<Utc>>, Box<dyn Error>> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    Ok(Some(parse_date_input(input, &Local::now())?))
}

/// Parse an id argument where `none` means "unset".
pub fn parse_optional_id(input: &str) -> Result<Option<i64>, Box<dyn Error>> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    Ok(Some(input.trim().parse()?))
}

fn short_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// One-line rendering used by `list`, `select show` and friends.
pub fn task_line(task: &Task, snapshot: &Snapshot, blocked: bool) -> String {
    let check = if task.is_done() { "[x]" } else { "[ ]" };
    let mut line = format!("{:>4} {check} {}", task.id, task.title);
    if task.flagged {
        line.push_str(" !");
    }
    for name in snapshot.context_names(task) {
        line.push_str(&format!(" @{name}"));
    }
    if let Some(project) = snapshot.project_title(task) {
        line.push_str(&format!(" ({project})"));
    }
    if let Some(due) = task.due_at {
        line.push_str(&format!(" due {}", short_date(due)));
    }
    if let Some(defer) = task.defer_at {
        line.push_str(&format!(" defer {}", short_date(defer)));
    }
    if task.recurrence.is_recurring() {
        line.push_str(&format!(" [{}]", task.recurrence));
    }
    if blocked {
        line.push_str(" (blocked)");
    }
    line
}

/// Print the "Task created" style result for a new task.
pub fn report_created(kind: &str, id: TaskId) {
    println!("{kind} created: {id}");
}
