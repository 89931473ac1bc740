//! Core error types for nextaction-core.
//!
//! Validation failures are raised before any store mutation, store failures
//! are propagated with their SQLite message, and stale identifiers surface as
//! [`CoreError::NotFound`] instead of panicking.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nextaction-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The identifier does not name a live entity.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    pub fn task_not_found(id: i64) -> Self {
        CoreError::NotFound { entity: "task", id }
    }

    pub fn project_not_found(id: i64) -> Self {
        CoreError::NotFound { entity: "project", id }
    }

    pub fn context_not_found(id: i64) -> Self {
        CoreError::NotFound { entity: "context", id }
    }

    /// True for stale-identifier failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key is not part of the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Value does not fit the key's type
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    #[error("task {0} cannot depend on itself")]
    SelfDependency(i64),

    #[error("dependency {task_id} -> {depends_on} would create a cycle")]
    DependencyCycle { task_id: i64, depends_on: i64 },

    #[error("recurrence interval must be at least 1, got {0}")]
    InvalidInterval(u32),

    #[error("unknown perspective '{0}' (expected today, anytime, flagged, inbox, completed, project:<id> or context:<id>)")]
    UnknownPerspective(String),

    #[error("cannot parse date '{0}' (expected today, tomorrow, weekend, YYYY-MM-DD or RFC 3339)")]
    InvalidDate(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
