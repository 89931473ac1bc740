//! SQLite-based storage for tasks, projects and contexts.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{default_db_path, migrations};
use crate::context::{is_valid_color, Context};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::project::{Project, ProjectType};
use crate::store::TaskStore;
use crate::task::{
    validate_title, ContextId, NewTask, ProjectId, Recurrence, RecurrencePattern, Task, TaskId,
    TaskStatus,
};

// === Helper Functions ===

/// Parse task status from database string
fn parse_task_status(status_str: &str) -> TaskStatus {
    status_str.parse().unwrap_or_default()
}

/// Parse project type from database string
fn parse_project_type(type_str: &str) -> ProjectType {
    type_str.parse().unwrap_or_default()
}

/// Parse recurrence from its two columns; bad data degrades to "no recurrence".
fn parse_recurrence(pattern_str: &str, interval: i64) -> Recurrence {
    let pattern: RecurrencePattern = pattern_str.parse().unwrap_or_default();
    let interval = u32::try_from(interval).ok().filter(|n| *n >= 1).unwrap_or(1);
    Recurrence { pattern, interval }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_datetime(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Format datetime for database storage
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const TASK_COLUMNS: &str = "id, title, notes, status, project_id, flagged, created_at, \
     modified_at, defer_at, due_at, order_index, recurrence_pattern, recurrence_interval";

/// Build a Task from a database row; relationship lists are filled in by the caller.
fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;
    let modified_at_str: String = row.get(7)?;
    let pattern_str: String = row.get(11)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        notes: row.get(2)?,
        status: parse_task_status(&status_str),
        project_id: row.get(4)?,
        flagged: row.get(5)?,
        created_at: parse_datetime_fallback(&created_at_str),
        modified_at: parse_datetime_fallback(&modified_at_str),
        defer_at: parse_optional_datetime(row.get(8)?),
        due_at: parse_optional_datetime(row.get(9)?),
        order_index: row.get(10)?,
        recurrence: parse_recurrence(&pattern_str, row.get(12)?),
        context_ids: Vec::new(),
        dependency_ids: Vec::new(),
    })
}

fn row_to_project(row: &rusqlite::Row) -> Result<Project, rusqlite::Error> {
    let type_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        project_type: parse_project_type(&type_str),
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

fn row_to_context(row: &rusqlite::Row) -> Result<Context, rusqlite::Error> {
    let created_at_str: String = row.get(3)?;
    Ok(Context {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName(kind));
    }
    Ok(())
}

/// SQLite database for task storage.
///
/// Stores tasks, projects, contexts, their join tables and a small key/value
/// table for view state.
pub struct TaskDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl TaskDb {
    /// Open the task database at `<data_dir>/nextaction.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.migrate()?;
        debug!(path = %path.display(), "opened task database");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    /// File backing this database, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        // Base tables (v1 schema) first
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tasks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                notes       TEXT NOT NULL DEFAULT '',
                status      TEXT NOT NULL DEFAULT 'inbox',
                project_id  INTEGER,
                flagged     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                modified_at TEXT NOT NULL,
                defer_at    TEXT,
                due_at      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

            CREATE TABLE IF NOT EXISTS projects (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                title        TEXT NOT NULL,
                project_type TEXT NOT NULL DEFAULT 'sequential',
                created_at   TEXT NOT NULL
            );",
        )?;

        // Incremental migrations (v1 -> v2 -> ...)
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    fn task_exists(&self, id: TaskId) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM tasks WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn require_task(&self, id: TaskId) -> Result<()> {
        if self.task_exists(id)? {
            Ok(())
        } else {
            Err(CoreError::task_not_found(id))
        }
    }

    fn require_project(&self, id: ProjectId) -> Result<()> {
        self.get_project(id).map(|_| ())
    }

    fn require_context(&self, id: ContextId) -> Result<()> {
        self.get_context(id).map(|_| ())
    }

    /// Set one task column and bump `modified_at`.
    fn update_task_column(&self, id: TaskId, column: &'static str, value: &dyn ToSql) -> Result<()> {
        let sql = format!("UPDATE tasks SET {column} = ?1, modified_at = ?2 WHERE id = ?3");
        let rows = self
            .conn
            .execute(&sql, params![value, format_datetime(Utc::now()), id])?;
        if rows == 0 {
            return Err(CoreError::task_not_found(id));
        }
        debug!(task_id = id, column, "task updated");
        Ok(())
    }

    fn ids_grouped_by_task(&self, sql: &str) -> Result<HashMap<TaskId, Vec<i64>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        let mut grouped: HashMap<TaskId, Vec<i64>> = HashMap::new();
        for row in rows {
            let (task_id, other) = row?;
            grouped.entry(task_id).or_default().push(other);
        }
        Ok(grouped)
    }

    /// Would adding `task_id -> depends_on` close a cycle?
    ///
    /// Walks prerequisites breadth-first from `depends_on`; reaching `task_id`
    /// means `task_id` is already upstream of it.
    fn would_create_cycle(&self, task_id: TaskId, depends_on: TaskId) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT depends_on_id FROM task_dependencies WHERE task_id = ?1")?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([depends_on]);

        while let Some(current) = queue.pop_front() {
            if current == task_id {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            let next = stmt.query_map(params![current], |row| row.get::<_, i64>(0))?;
            for id in next {
                queue.push_back(id?);
            }
        }
        Ok(false)
    }

    // === Contexts ===

    pub fn get_context(&self, id: ContextId) -> Result<Context> {
        self.conn
            .query_row(
                "SELECT id, name, color, created_at FROM contexts WHERE id = ?1",
                params![id],
                row_to_context,
            )
            .optional()?
            .ok_or_else(|| CoreError::context_not_found(id))
    }

    /// Case-insensitive lookup; a leading `@` is ignored.
    ///
    /// Matched in Rust rather than with `COLLATE NOCASE`, which only folds ASCII.
    pub fn find_context_by_name(&self, name: &str) -> Result<Option<Context>> {
        let context = self
            .load_all_contexts()?
            .into_iter()
            .find(|c| c.matches_name(name));
        Ok(context)
    }

    pub fn find_project_by_title(&self, title: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, title, project_type, created_at FROM projects
                 WHERE title = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
                params![title.trim()],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    // === Key/value ===

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // === Backup ===

    /// Write a consistent copy of the database to `dest`.
    ///
    /// # Errors
    /// Fails if `dest` already exists or cannot be written.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(CoreError::Custom(format!(
                "backup target {} already exists",
                dest.display()
            )));
        }
        let dest_str = dest.to_string_lossy().into_owned();
        self.conn.execute("VACUUM INTO ?1", params![dest_str])?;
        debug!(dest = %dest.display(), "database backed up");
        Ok(())
    }
}

impl TaskStore for TaskDb {
    fn load_all_tasks(&self) -> Result<Vec<Task>> {
        let mut contexts =
            self.ids_grouped_by_task("SELECT task_id, context_id FROM task_contexts ORDER BY context_id")?;
        let mut dependencies = self.ids_grouped_by_task(
            "SELECT task_id, depends_on_id FROM task_dependencies ORDER BY depends_on_id",
        )?;

        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            let mut task = row?;
            task.context_ids = contexts.remove(&task.id).unwrap_or_default();
            task.dependency_ids = dependencies.remove(&task.id).unwrap_or_default();
            tasks.push(task);
        }
        Ok(tasks)
    }

    fn load_all_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, project_type, created_at FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn load_all_contexts(&self) -> Result<Vec<Context>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, created_at FROM contexts ORDER BY name COLLATE NOCASE")?;
        let contexts = stmt
            .query_map([], row_to_context)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contexts)
    }

    fn get_task(&self, id: TaskId) -> Result<Task> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let mut task = self
            .conn
            .query_row(&sql, params![id], row_to_task)
            .optional()?
            .ok_or_else(|| CoreError::task_not_found(id))?;
        task.context_ids = self.get_task_contexts(id)?;
        task.dependency_ids = self.get_task_dependencies(id)?;
        Ok(task)
    }

    fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.conn
            .query_row(
                "SELECT id, title, project_type, created_at FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| CoreError::project_not_found(id))
    }

    fn get_task_contexts(&self, id: TaskId) -> Result<Vec<ContextId>> {
        let mut stmt = self.conn.prepare(
            "SELECT context_id FROM task_contexts WHERE task_id = ?1 ORDER BY context_id",
        )?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_task_dependencies(&self, id: TaskId) -> Result<Vec<TaskId>> {
        let mut stmt = self.conn.prepare(
            "SELECT depends_on_id FROM task_dependencies WHERE task_id = ?1 ORDER BY depends_on_id",
        )?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn create_task(&self, draft: &NewTask) -> Result<TaskId> {
        draft.validate()?;
        if let Some(project_id) = draft.project_id {
            self.require_project(project_id)?;
        }

        let now = format_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO tasks (title, notes, status, project_id, flagged, created_at,
                                modified_at, defer_at, due_at, order_index,
                                recurrence_pattern, recurrence_interval)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                draft.title.trim(),
                draft.notes,
                draft.status.as_str(),
                draft.project_id,
                draft.flagged,
                now,
                draft.defer_at.map(format_datetime),
                draft.due_at.map(format_datetime),
                draft.order_index,
                draft.recurrence.pattern.as_str(),
                draft.recurrence.interval,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(task_id = id, "task created");
        Ok(id)
    }

    fn update_task_title(&self, id: TaskId, title: &str) -> Result<()> {
        validate_title(title)?;
        self.update_task_column(id, "title", &title.trim())
    }

    fn update_task_notes(&self, id: TaskId, notes: &str) -> Result<()> {
        self.update_task_column(id, "notes", &notes)
    }

    fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<()> {
        self.update_task_column(id, "status", &status.as_str())
    }

    fn update_task_defer_at(&self, id: TaskId, defer_at: Option<DateTime<Utc>>) -> Result<()> {
        self.update_task_column(id, "defer_at", &defer_at.map(format_datetime))
    }

    fn update_task_due_at(&self, id: TaskId, due_at: Option<DateTime<Utc>>) -> Result<()> {
        self.update_task_column(id, "due_at", &due_at.map(format_datetime))
    }

    fn update_task_flagged(&self, id: TaskId, flagged: bool) -> Result<()> {
        self.update_task_column(id, "flagged", &flagged)
    }

    fn update_task_order_index(&self, id: TaskId, order_index: Option<i64>) -> Result<()> {
        self.update_task_column(id, "order_index", &order_index)
    }

    fn update_task_recurrence(&self, id: TaskId, recurrence: Recurrence) -> Result<()> {
        if recurrence.interval == 0 {
            return Err(ValidationError::InvalidInterval(0).into());
        }
        let rows = self.conn.execute(
            "UPDATE tasks SET recurrence_pattern = ?1, recurrence_interval = ?2, modified_at = ?3
             WHERE id = ?4",
            params![
                recurrence.pattern.as_str(),
                recurrence.interval,
                format_datetime(Utc::now()),
                id
            ],
        )?;
        if rows == 0 {
            return Err(CoreError::task_not_found(id));
        }
        debug!(task_id = id, recurrence = %recurrence, "task recurrence updated");
        Ok(())
    }

    fn assign_task_to_project(&self, id: TaskId, project_id: Option<ProjectId>) -> Result<()> {
        if let Some(project_id) = project_id {
            self.require_project(project_id)?;
        }
        self.update_task_column(id, "project_id", &project_id)
    }

    fn delete_task(&self, id: TaskId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM task_dependencies WHERE task_id = ?1 OR depends_on_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM task_contexts WHERE task_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if rows == 0 {
            // Dropping the transaction rolls it back.
            return Err(CoreError::task_not_found(id));
        }
        tx.commit()?;
        debug!(task_id = id, "task deleted");
        Ok(())
    }

    fn add_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()> {
        if task_id == depends_on {
            return Err(ValidationError::SelfDependency(task_id).into());
        }
        self.require_task(task_id)?;
        self.require_task(depends_on)?;
        if self.would_create_cycle(task_id, depends_on)? {
            return Err(ValidationError::DependencyCycle {
                task_id,
                depends_on,
            }
            .into());
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_id) VALUES (?1, ?2)",
            params![task_id, depends_on],
        )?;
        debug!(task_id, depends_on, "dependency added");
        Ok(())
    }

    fn remove_dependency(&self, task_id: TaskId, depends_on: TaskId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM task_dependencies WHERE task_id = ?1 AND depends_on_id = ?2",
            params![task_id, depends_on],
        )?;
        if rows == 0 {
            return Err(CoreError::NotFound {
                entity: "dependency",
                id: depends_on,
            });
        }
        debug!(task_id, depends_on, "dependency removed");
        Ok(())
    }

    fn add_context_to_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()> {
        self.require_task(task_id)?;
        self.require_context(context_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO task_contexts (task_id, context_id) VALUES (?1, ?2)",
            params![task_id, context_id],
        )?;
        Ok(())
    }

    fn remove_context_from_task(&self, task_id: TaskId, context_id: ContextId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM task_contexts WHERE task_id = ?1 AND context_id = ?2",
            params![task_id, context_id],
        )?;
        if rows == 0 {
            return Err(CoreError::NotFound {
                entity: "task context",
                id: context_id,
            });
        }
        Ok(())
    }

    fn create_project(&self, title: &str, project_type: ProjectType) -> Result<ProjectId> {
        validate_name("project", title)?;
        self.conn.execute(
            "INSERT INTO projects (title, project_type, created_at) VALUES (?1, ?2, ?3)",
            params![title.trim(), project_type.as_str(), format_datetime(Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(project_id = id, %project_type, "project created");
        Ok(id)
    }

    fn update_project_title(&self, id: ProjectId, title: &str) -> Result<()> {
        validate_name("project", title)?;
        let rows = self.conn.execute(
            "UPDATE projects SET title = ?1 WHERE id = ?2",
            params![title.trim(), id],
        )?;
        if rows == 0 {
            return Err(CoreError::project_not_found(id));
        }
        Ok(())
    }

    fn update_project_type(&self, id: ProjectId, project_type: ProjectType) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE projects SET project_type = ?1 WHERE id = ?2",
            params![project_type.as_str(), id],
        )?;
        if rows == 0 {
            return Err(CoreError::project_not_found(id));
        }
        debug!(project_id = id, %project_type, "project type changed");
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let unassigned = tx.execute(
            "UPDATE tasks SET project_id = NULL, modified_at = ?1 WHERE project_id = ?2",
            params![format_datetime(Utc::now()), id],
        )?;
        let rows = tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(CoreError::project_not_found(id));
        }
        tx.commit()?;
        debug!(project_id = id, unassigned, "project deleted");
        Ok(())
    }

    fn create_context(&self, name: &str, color: &str) -> Result<ContextId> {
        let name = name.trim().trim_start_matches('@');
        validate_name("context", name)?;
        if !is_valid_color(color) {
            return Err(ValidationError::InvalidValue {
                field: "color".into(),
                message: format!("'{color}' is not a #RRGGBB colour"),
            }
            .into());
        }
        if self.find_context_by_name(name)?.is_some() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: format!("context '{name}' already exists"),
            }
            .into());
        }

        self.conn.execute(
            "INSERT INTO contexts (name, color, created_at) VALUES (?1, ?2, ?3)",
            params![name, color, format_datetime(Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(context_id = id, name, "context created");
        Ok(id)
    }

    fn delete_context(&self, id: ContextId) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM task_contexts WHERE context_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM contexts WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(CoreError::context_not_found(id));
        }
        tx.commit()?;
        debug!(context_id = id, "context deleted");
        Ok(())
    }
}
