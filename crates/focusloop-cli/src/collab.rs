//! Completion collaborators: statistics recorder, desktop notifier,
//! and system chime. All of them are best-effort; the hook dispatcher
//! logs and swallows their failures.

use chrono::Utc;
use notify_rust::{Notification, Urgency};
use std::path::Path;

use focusloop_core::{
    CompletionHooks, Config, Database, Mode, Notifier, SessionSink, SoundPlayer,
};

type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Wire up the collaborators the user enabled. Statistics are always
/// recorded; sound and desktop notifications follow the config toggles.
pub fn build_hooks(config: &Config) -> CompletionHooks {
    let mut hooks = CompletionHooks::new();
    match Database::open() {
        Ok(db) => hooks = hooks.with_sink(Box::new(SessionRecorder { db })),
        Err(e) => tracing::warn!(error = %e, "statistics disabled, database unavailable"),
    }
    if config.notifications.sounds {
        hooks = hooks.with_sound(Box::new(SystemChime {
            custom: config.notifications.custom_sound.clone(),
        }));
    }
    if config.notifications.desktop {
        hooks = hooks.with_notifier(Box::new(DesktopNotifier));
    }
    hooks
}

/// Writes completed intervals to the session store.
struct SessionRecorder {
    db: Database,
}

impl SessionSink for SessionRecorder {
    fn record(&mut self, mode: Mode, duration_min: u64, completed: bool) -> HookResult {
        self.db
            .record_session(mode, duration_min, completed, Utc::now())?;
        Ok(())
    }
}

/// Desktop notification via the freedesktop/macOS/Windows backends.
struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&mut self, mode: Mode) -> HookResult {
        let (summary, body) = match mode {
            Mode::Focus => (
                "Focus session complete!",
                "Great work! Time for a well-deserved break.",
            ),
            Mode::ShortBreak => (
                "Short break complete!",
                "Break time is over. Ready to focus again?",
            ),
            Mode::LongBreak => (
                "Long break complete!",
                "Long break finished! Feeling refreshed?",
            ),
        };
        Notification::new()
            .summary(summary)
            .body(body)
            .appname("focusloop")
            .icon("alarm-clock")
            .urgency(Urgency::Normal)
            .show()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Plays a completion chime through whichever system player is around.
struct SystemChime {
    custom: Option<String>,
}

impl SoundPlayer for SystemChime {
    fn play(&mut self) -> HookResult {
        let mut candidates: Vec<(&str, String)> = Vec::new();
        if let Some(custom) = &self.custom {
            candidates.push(("paplay", custom.clone()));
            candidates.push(("aplay", custom.clone()));
        }
        candidates.push((
            "paplay",
            "/usr/share/sounds/freedesktop/stereo/complete.oga".into(),
        ));
        candidates.push(("aplay", "/usr/share/sounds/sound-icons/prompt.wav".into()));

        for (cmd, file) in candidates {
            if Path::new(&file).exists() {
                // Spawn detached; we never wait on playback.
                std::process::Command::new(cmd)
                    .arg(&file)
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .spawn()
                    .map_err(|e| e.to_string())?;
                return Ok(());
            }
        }
        Err("no completion sound available".into())
    }
}
