mod config;
mod database;

pub use config::{Config, NotificationsConfig, UiConfig};
pub use database::{Database, SessionRecord, Stats, Streaks};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// Defaults to `~/.config/focusloop/`. `FOCUSLOOP_ENV=dev` switches to
/// `~/.config/focusloop-dev/`, and `FOCUSLOOP_DATA_DIR` overrides the
/// path entirely (used by the CLI tests to stay out of the real home
/// directory).
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(dir) = std::env::var("FOCUSLOOP_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSLOOP_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("focusloop-dev")
    } else {
        base_dir.join("focusloop")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
