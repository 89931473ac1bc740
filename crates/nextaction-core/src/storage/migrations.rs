//! Database schema migrations for nextaction.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 4;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }
    if current_version < 4 {
        migrate_v4(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    debug!(version, "schema version updated");
    Ok(())
}

/// Migration v1: baseline.
///
/// `tasks` and `projects` are created by `TaskDb::migrate()` directly; this
/// only records the version.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    set_schema_version(conn, 1)
}

/// Migration v2: contexts and the task/context join table.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS contexts (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            color      TEXT NOT NULL DEFAULT '#808080',
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_contexts_name
            ON contexts(name COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS task_contexts (
            task_id    INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            context_id INTEGER NOT NULL REFERENCES contexts(id) ON DELETE CASCADE,
            PRIMARY KEY (task_id, context_id)
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: dependencies, manual ordering and recurrence.
///
/// Adds to `tasks`:
/// - order_index: manual ordering key (NULL = unset)
/// - recurrence_pattern: none, daily, weekly, monthly, yearly
/// - recurrence_interval: multiplier, at least 1
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE tasks ADD COLUMN order_index INTEGER;
         ALTER TABLE tasks ADD COLUMN recurrence_pattern TEXT NOT NULL DEFAULT 'none';
         ALTER TABLE tasks ADD COLUMN recurrence_interval INTEGER NOT NULL DEFAULT 1;

         CREATE TABLE IF NOT EXISTS task_dependencies (
            task_id       INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            depends_on_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            PRIMARY KEY (task_id, depends_on_id),
            CHECK (task_id <> depends_on_id)
         );
         CREATE INDEX IF NOT EXISTS idx_task_dependencies_depends_on
            ON task_dependencies(depends_on_id);",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()
}

/// Migration v4: key/value table for persisted view state.
fn migrate_v4(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 4)?;
    tx.commit()
}
