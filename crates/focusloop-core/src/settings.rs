//! Timer settings snapshot.
//!
//! The clock never reads ambient configuration; it is handed an owned
//! [`TimerSettings`] value at construction and again through
//! `set_settings`. Persistence of these values belongs to
//! [`crate::storage::Config`].

use serde::{Deserialize, Serialize};

use crate::timer::Mode;

/// Grace window between an interval hitting zero and the automatic
/// mode transition, in milliseconds.
pub const DEFAULT_COMPLETION_GRACE_MS: u64 = 1500;

/// User-tunable timer parameters.
///
/// Durations are whole minutes. Values are not validated on
/// deserialization; call [`TimerSettings::sanitized`] at the boundary
/// where settings enter the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_focus_min")]
    pub focus_min: u32,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    /// Number of focus sessions per long-break cycle.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_pomodoros: bool,
    #[serde(default = "default_grace_ms")]
    pub completion_grace_ms: u64,
}

fn default_focus_min() -> u32 {
    25
}
fn default_short_break_min() -> u32 {
    5
}
fn default_long_break_min() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_grace_ms() -> u64 {
    DEFAULT_COMPLETION_GRACE_MS
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_min: default_focus_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            long_break_interval: default_long_break_interval(),
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            completion_grace_ms: default_grace_ms(),
        }
    }
}

impl TimerSettings {
    /// Clamp out-of-contract values to safe minimums.
    ///
    /// A zero `long_break_interval` becomes 1. Zero durations are left
    /// in place here and clamped to one second by [`Self::duration_secs`],
    /// so the clock can never enter a zero-length or negative interval.
    /// Clamping is logged once, at this boundary, not inside the clock.
    pub fn sanitized(mut self) -> Self {
        if self.long_break_interval == 0 {
            tracing::warn!("long_break_interval of 0 clamped to 1");
            self.long_break_interval = 1;
        }
        if self.focus_min == 0 || self.short_break_min == 0 || self.long_break_min == 0 {
            tracing::warn!(
                focus_min = self.focus_min,
                short_break_min = self.short_break_min,
                long_break_min = self.long_break_min,
                "zero-minute duration will run as a one-second interval"
            );
        }
        self
    }

    /// Full duration of `mode` in seconds, clamped to at least one second.
    pub fn duration_secs(&self, mode: Mode) -> u64 {
        let minutes = match mode {
            Mode::Focus => self.focus_min,
            Mode::ShortBreak => self.short_break_min,
            Mode::LongBreak => self.long_break_min,
        };
        (u64::from(minutes) * 60).max(1)
    }

    /// Full duration of `mode` in whole minutes, as recorded in statistics.
    pub fn duration_min(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Focus => u64::from(self.focus_min),
            Mode::ShortBreak => u64::from(self.short_break_min),
            Mode::LongBreak => u64::from(self.long_break_min),
        }
    }
}
