use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Mode;

/// Every observable state change in the clock produces an `Event`.
///
/// The CLI prints these as JSON; the completion hooks consume
/// [`Event::Completed`] to drive side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Started {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Paused {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Reset {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSelected {
        mode: Mode,
        at: DateTime<Utc>,
    },
    /// An interval ran down to zero. Emitted at most once per interval,
    /// strictly before the mode transition is applied.
    Completed {
        mode: Mode,
        duration_min: u64,
        cycle_count: u32,
        at: DateTime<Utc>,
    },
    /// The deferred transition fired (or was applied eagerly by a
    /// `start` issued during the grace window).
    ModeChanged {
        from: Mode,
        to: Mode,
        cycle_count: u32,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    Snapshot {
        mode: Mode,
        remaining_secs: u64,
        total_secs: u64,
        running: bool,
        completed: bool,
        cycle_count: u32,
        /// Position within the long-break cycle, always in
        /// `1..=long_break_interval`.
        cycle_progress: u32,
        at: DateTime<Utc>,
    },
}
