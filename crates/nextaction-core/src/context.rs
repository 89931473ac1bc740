//! Contexts are free-form tags (`@home`, `@phone`) with a display colour.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::ContextId;

/// Colour given to contexts created implicitly by quick capture.
pub const DEFAULT_CONTEXT_COLOR: &str = "#808080";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Context {
    pub id: ContextId,
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Context {
    /// Context names compare case-insensitively and without a leading `@`.
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('@').to_lowercase()
}

/// Accepts `#RGB` or `#RRGGBB`.
pub fn is_valid_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}
