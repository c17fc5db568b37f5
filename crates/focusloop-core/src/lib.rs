//! # Focusloop Core Library
//!
//! Core logic for Focusloop, a Pomodoro session timer. The centerpiece
//! is the [`SessionClock`]: a wall-clock-anchored countdown state
//! machine with Focus/ShortBreak/LongBreak modes, cycle tracking, and
//! one-shot completion side effects.
//!
//! ## Architecture
//!
//! - **Session clock**: tick-driven state machine; the host calls
//!   `tick()` periodically and the clock derives remaining time from an
//!   absolute end timestamp, so missed wake-ups never skew the countdown
//! - **Completion hooks**: pluggable collaborators (statistics, sound,
//!   notification) invoked exactly once per completed interval
//! - **Storage**: TOML configuration and SQLite session history; the
//!   clock itself persists nothing and is rebuilt from a settings
//!   snapshot each session
//!
//! ## Key components
//!
//! - [`SessionClock`]: the timer state machine
//! - [`TimerSettings`]: durations, long-break interval, auto-start flags
//! - [`CompletionHooks`]: side-effect dispatch on completion
//! - [`Config`] / [`Database`]: persisted preferences and statistics

pub mod error;
pub mod events;
pub mod settings;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use settings::{TimerSettings, DEFAULT_COMPLETION_GRACE_MS};
pub use storage::{Config, Database, SessionRecord, Stats, Streaks};
pub use timer::{CompletionHooks, Mode, Notifier, SessionClock, SessionSink, SoundPlayer};
