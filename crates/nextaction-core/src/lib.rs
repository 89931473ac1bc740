//! # nextaction Core Library
//!
//! This library provides the core logic for nextaction, a GTD-style task
//! manager. It follows a CLI-first layout: every operation is available
//! through the standalone `nextaction` binary, which is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Availability**: deferred and blocked state per task, and the single
//!   visible task of each sequential project
//! - **Perspectives**: Today, Anytime, Flagged, Inbox, Completed, Project and
//!   Context views over an in-memory [`Snapshot`]
//! - **Recurrence**: completing a recurring task creates its next occurrence
//! - **Quick capture**: `Buy milk @errands #tomorrow !flag` into a task draft
//! - **Storage**: SQLite entity store and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TaskEngine`]: capture, completion, reordering and batch operations
//! - [`TaskStore`]: the storage seam, implemented by [`TaskDb`]
//! - [`Config`]: Application configuration management

pub mod availability;
pub mod capture;
pub mod context;
pub mod engine;
pub mod error;
pub mod export;
pub mod perspective;
pub mod project;
pub mod recurrence;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod task;

pub use availability::{is_blocked, is_deferred, sequential_visible_task, Availability};
pub use capture::{parse_date_input, CaptureDraft};
pub use context::Context;
pub use engine::{BatchReport, CompletionOutcome, TaskEngine};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use export::ExportFormat;
pub use perspective::{
    compute_perspective, compute_perspective_in, Direction, Perspective, PerspectiveOptions,
};
pub use project::{Project, ProjectType};
pub use recurrence::DatePolicy;
pub use session::ViewState;
pub use snapshot::Snapshot;
pub use storage::{Config, TaskDb};
pub use store::TaskStore;
pub use task::{
    ContextId, NewTask, ProjectId, Recurrence, RecurrencePattern, Task, TaskId, TaskStatus,
};
