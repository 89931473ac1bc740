mod config;
pub mod migrations;
pub mod task_db;

pub use config::{CaptureConfig, Config, PerspectiveConfig, RecurrenceConfig};
pub use task_db::TaskDb;

use std::path::PathBuf;

use crate::error::Result;

/// Returns the nextaction data directory, creating it if needed.
///
/// `NEXTACTION_HOME` wins when set. Otherwise `~/.config/nextaction[-dev]/`
/// based on `NEXTACTION_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("NEXTACTION_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("NEXTACTION_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("nextaction-dev")
            } else {
                base_dir.join("nextaction")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default database location inside [`data_dir`].
pub fn default_db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("nextaction.db"))
}
