//! Plain-text, Markdown and CSV renderings of a task list, plus database
//! backups.

use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::snapshot::Snapshot;
use crate::storage::TaskDb;
use crate::task::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Markdown,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ValidationError::InvalidValue {
                field: "format".into(),
                message: format!("expected text, markdown or csv, got '{other}'"),
            }),
        }
    }
}

const STATUS_GROUPS: [(TaskStatus, &str); 3] = [
    (TaskStatus::Inbox, "Inbox"),
    (TaskStatus::Active, "Active"),
    (TaskStatus::Done, "Done"),
];

fn format_date(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|d| d.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn project_name<'a>(snapshot: &'a Snapshot, task: &Task) -> &'a str {
    snapshot.project_title(task).unwrap_or("Inbox")
}

/// Render `tasks` (already filtered and ordered) grouped by status.
pub fn render(
    tasks: &[Task],
    snapshot: &Snapshot,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> String {
    match format {
        ExportFormat::Text => render_text(tasks, snapshot, exported_at),
        ExportFormat::Markdown => render_markdown(tasks, snapshot, exported_at),
        ExportFormat::Csv => render_csv(tasks, snapshot),
    }
}

fn render_text(tasks: &[Task], snapshot: &Snapshot, exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "nextaction export");
    let _ = writeln!(out, "=================");
    let _ = writeln!(
        out,
        "Exported: {}\n",
        exported_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );

    for (status, label) in STATUS_GROUPS {
        let group: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{label} ({})", group.len());
        let _ = writeln!(out, "{}", "-".repeat(label.len() + 4));
        for task in group {
            let star = if task.flagged { " *" } else { "" };
            let _ = writeln!(out, "- {}{star}", task.title);
            let _ = writeln!(out, "  id: {}  project: {}", task.id, project_name(snapshot, task));
            let _ = writeln!(
                out,
                "  defer: {}  due: {}",
                format_date(task.defer_at),
                format_date(task.due_at)
            );
            let contexts = snapshot.context_names(task);
            if !contexts.is_empty() {
                let _ = writeln!(out, "  contexts: {}", contexts.join(", "));
            }
            if task.recurrence.is_recurring() {
                let _ = writeln!(out, "  repeats: {}", task.recurrence);
            }
            if !task.notes.is_empty() {
                let _ = writeln!(out, "  notes: {}", task.notes);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Total: {} task(s)", tasks.len());
    out
}

fn render_markdown(tasks: &[Task], snapshot: &Snapshot, exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# nextaction export\n");
    let _ = writeln!(
        out,
        "**Exported:** {}\n",
        exported_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );

    for (status, label) in STATUS_GROUPS {
        let group: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## {label} ({})\n", group.len());
        for task in group {
            let check = if task.is_done() { "x" } else { " " };
            let star = if task.flagged { " ⭐" } else { "" };
            let _ = writeln!(out, "- [{check}] **{}**{star}", task.title);
            let _ = writeln!(out, "  - **Project:** {}", project_name(snapshot, task));
            if task.defer_at.is_some() {
                let _ = writeln!(out, "  - **Defer:** {}", format_date(task.defer_at));
            }
            if task.due_at.is_some() {
                let _ = writeln!(out, "  - **Due:** {}", format_date(task.due_at));
            }
            let contexts = snapshot.context_names(task);
            if !contexts.is_empty() {
                let tags: Vec<String> = contexts.iter().map(|c| format!("@{c}")).collect();
                let _ = writeln!(out, "  - **Contexts:** {}", tags.join(" "));
            }
            if task.recurrence.is_recurring() {
                let _ = writeln!(out, "  - **Repeats:** {}", task.recurrence);
            }
            if !task.notes.is_empty() {
                let _ = writeln!(out, "  - **Notes:** {}", task.notes);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "---\n**Total:** {} task(s)", tasks.len());
    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(tasks: &[Task], snapshot: &Snapshot) -> String {
    let mut out = String::from(
        "id,title,status,project,flagged,defer,due,created,modified,recurrence,contexts,notes\n",
    );
    for task in tasks {
        let fields = [
            task.id.to_string(),
            csv_field(&task.title),
            task.status.to_string(),
            csv_field(snapshot.project_title(task).unwrap_or("")),
            task.flagged.to_string(),
            task.defer_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            task.due_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            task.created_at.to_rfc3339(),
            task.modified_at.to_rfc3339(),
            csv_field(&if task.recurrence.is_recurring() {
                task.recurrence.to_string()
            } else {
                String::new()
            }),
            csv_field(&snapshot.context_names(task).join(";")),
            csv_field(&task.notes),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Default file name for an export written at `now`.
pub fn export_file_name(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "nextaction-export-{}.{}",
        now.with_timezone(&Local).format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Backup path next to the database: `<db>.<timestamp>.bak`.
pub fn backup_path(db_path: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut name = db_path.as_os_str().to_owned();
    name.push(format!(".{}.bak", now.format("%Y%m%d-%H%M%S")));
    PathBuf::from(name)
}

/// Back up a file database next to itself; returns the backup path.
pub fn backup(db: &TaskDb, now: DateTime<Utc>) -> Result<PathBuf> {
    let source = db.path().ok_or_else(|| {
        crate::error::CoreError::Custom("in-memory databases cannot be backed up".into())
    })?;
    let dest = backup_path(source, now);
    db.backup_to(&dest)?;
    tracing::info!(dest = %dest.display(), "backup written");
    Ok(dest)
}
