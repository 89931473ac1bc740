//! TOML-based application configuration.
//!
//! Stores user preferences for:
//! - how recurring tasks carry their dates
//! - quick-capture defaults
//! - the default perspective and blocked-task visibility
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::context::{is_valid_color, DEFAULT_CONTEXT_COLOR};
use crate::error::{ConfigError, Result};
use crate::perspective::{Perspective, PerspectiveOptions};
use crate::recurrence::DatePolicy;

/// Recurrence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceConfig {
    #[serde(default)]
    pub date_policy: DatePolicy,
}

/// Quick-capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Colour for contexts created implicitly by capture.
    #[serde(default = "default_context_color")]
    pub default_context_color: String,
}

/// Perspective configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerspectiveConfig {
    /// Used by `list` when no perspective is given and none is saved.
    #[serde(default)]
    pub default: Perspective,
    #[serde(default)]
    pub hide_blocked: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub perspective: PerspectiveConfig,
}

fn default_context_color() -> String {
    DEFAULT_CONTEXT_COLOR.into()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_context_color: default_context_color(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => {
                    let b = value.trim().parse::<bool>().map_err(|_| {
                        ConfigError::ParseFailed(format!("{key}: expected true or false, got '{value}'"))
                    })?;
                    serde_json::Value::Bool(b)
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(ConfigError::ParseFailed(format!("{key} is a section, not a value")));
                }
                _ => serde_json::Value::String(value.trim().to_string()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `<data_dir>/config.toml`, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to `<data_dir>/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)
            .map_err(|e| ConfigError::ParseFailed(format!("{key}: {e}")))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, body) in sections {
                if let serde_json::Value::Object(fields) = body {
                    for (field, _) in fields {
                        let key = format!("{section}.{field}");
                        if let Some(value) = self.get(&key) {
                            out.push((key, value));
                        }
                    }
                }
            }
        }
        out
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_color(&self.capture.default_context_color) {
            return Err(ConfigError::ParseFailed(format!(
                "capture.default_context_color: '{}' is not a #RRGGBB colour",
                self.capture.default_context_color
            )));
        }
        Ok(())
    }

    pub fn perspective_options(&self) -> PerspectiveOptions {
        PerspectiveOptions {
            hide_blocked: self.perspective.hide_blocked,
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
