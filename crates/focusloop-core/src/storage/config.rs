//! TOML-based application configuration.
//!
//! Holds the persisted user preferences: timer settings, notification
//! and sound toggles, and the theme preference. Stored at
//! `~/.config/focusloop/config.toml`.
//!
//! The clock never reads this file; the CLI loads it and hands the
//! `[timer]` section to the clock as a settings snapshot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::settings::TimerSettings;

/// Notification and sound preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Play a chime when an interval completes.
    #[serde(default = "default_true")]
    pub sounds: bool,
    /// Send a desktop notification when an interval completes.
    #[serde(default = "default_true")]
    pub desktop: bool,
    /// Path to a custom chime file; falls back to system sounds.
    #[serde(default)]
    pub custom_sound: Option<String>,
}

/// Theme preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
}

fn default_true() -> bool {
    true
}
fn default_accent_color() -> String {
    "#3b82f6".into()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sounds: true,
            desktop: true,
            custom_sound: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            dark_mode: true,
            accent_color: default_accent_color(),
        }
    }
}

/// Application configuration, serialized to/from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::NoDataDir(e.to_string()))?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a value by dot-separated key, e.g. `timer.focus_min`.
    pub fn get(&self, key: &str) -> Option<String> {
        let root = toml::Value::try_from(self).ok()?;
        let mut current = &root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Update a value by dot-separated key. The new value is parsed
    /// according to the type of the existing value; unknown keys are
    /// rejected. Does not persist; call [`Config::save`] afterwards.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut root = toml::Value::try_from(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        set_by_path(&mut root, key, value)?;
        *self = root.try_into().map_err(|e: toml::de::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn set_by_path(root: &mut toml::Value, key: &str, raw: &str) -> Result<(), ConfigError> {
    let mut current = root;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            let table = current
                .as_table_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let existing = table
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let parsed = parse_like(existing, raw).map_err(|message| ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })?;
            table.insert(part.to_string(), parsed);
            return Ok(());
        }
        current = current
            .get_mut(part)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    }
    Err(ConfigError::UnknownKey(key.to_string()))
}

/// Parse `raw` into the same TOML type as `existing`.
fn parse_like(existing: &toml::Value, raw: &str) -> Result<toml::Value, String> {
    match existing {
        toml::Value::Boolean(_) => raw
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|e| e.to_string()),
        toml::Value::Integer(_) => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| e.to_string()),
        toml::Value::Float(_) => raw
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|e| e.to_string()),
        toml::Value::String(_) => Ok(toml::Value::String(raw.to_string())),
        other => Err(format!("cannot set values of type {}", other.type_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.focus_min, 25);
        assert!(parsed.notifications.sounds);
        assert!(parsed.ui.dark_mode);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.focus_min").as_deref(), Some("25"));
        assert_eq!(cfg.get("notifications.desktop").as_deref(), Some("true"));
        assert!(cfg.get("timer.no_such_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("timer.focus_min", "50").unwrap();
        cfg.set("notifications.sounds", "false").unwrap();
        cfg.set("ui.accent_color", "#ff5733").unwrap();
        assert_eq!(cfg.timer.focus_min, 50);
        assert!(!cfg.notifications.sounds);
        assert_eq!(cfg.ui.accent_color, "#ff5733");
    }

    #[test]
    fn set_rejects_unknown_keys() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timer.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("nonexistent.focus_min", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_type_mismatch() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timer.focus_min", "not_a_number"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("ui.dark_mode", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("timer.long_break_interval", "6").unwrap();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timer.long_break_interval, 6);
    }
}
