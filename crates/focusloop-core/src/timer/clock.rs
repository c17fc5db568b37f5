//! Session clock implementation.
//!
//! The clock is a wall-clock-anchored state machine. While running, the
//! single source of truth for remaining time is an absolute end
//! timestamp; `tick()` recomputes the countdown from it instead of
//! decrementing, so arbitrarily long gaps between wake-ups (a suspended
//! process, a deprioritized host loop) cost no accuracy.
//!
//! There are no internal threads. The caller drives progress by calling
//! `tick()` periodically; completion and the deferred mode transition
//! both surface through its return value.
//!
//! ## State transitions
//!
//! ```text
//! paused -> running -> completed (grace window) -> next mode
//!                 \-> paused
//! ```
//!
//! The grace window is a cancellable deadline, not a detached timer:
//! `pause`, `reset` and `select_mode` clear it, so a stale transition
//! can never resurrect superseded state.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::Mode;
use crate::events::Event;
use crate::settings::TimerSettings;

/// Wall-clock-anchored Pomodoro countdown with cycle tracking.
///
/// Every time-dependent command has an `*_at(now_ms)` form taking the
/// current instant as epoch milliseconds; the plain form supplies
/// `Utc::now()`. The explicit forms exist for hosts with their own
/// clock and for tests.
///
/// Serializable so a short-lived host (one CLI invocation per command)
/// can persist the clock between processes; the absolute end timestamp
/// keeps the countdown correct across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClock {
    settings: TimerSettings,
    mode: Mode,
    /// Frozen countdown value; refreshed from `end_at_ms` on every tick
    /// while running.
    remaining_secs: u64,
    running: bool,
    /// True only during the grace window between an interval hitting
    /// zero and the deferred transition being applied.
    completed: bool,
    /// Completed focus sessions since the last long break, 1-indexed.
    cycle_count: u32,
    /// Absolute deadline of the running interval (epoch ms). Set iff
    /// `running`. Owned exclusively by the clock.
    #[serde(default)]
    end_at_ms: Option<u64>,
    /// Deadline of the pending post-completion transition (epoch ms).
    #[serde(default)]
    transition_due_ms: Option<u64>,
}

impl SessionClock {
    pub fn new(settings: TimerSettings) -> Self {
        let settings = settings.sanitized();
        let remaining_secs = settings.duration_secs(Mode::Focus);
        Self {
            settings,
            mode: Mode::Focus,
            remaining_secs,
            running: false,
            completed: false,
            cycle_count: 1,
            end_at_ms: None,
            transition_due_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Countdown value as of the last command or tick.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Full duration of the current mode under current settings.
    pub fn total_secs(&self) -> u64 {
        self.settings.duration_secs(self.mode)
    }

    /// Position within the long-break cycle, always in
    /// `1..=long_break_interval`. Derived, never stored; recomputed
    /// whenever the cycle count or the interval setting changes, so a
    /// mid-cycle interval change may move it non-monotonically.
    pub fn cycle_progress(&self) -> u32 {
        cycle_progress_for(self.cycle_count, self.settings.long_break_interval)
    }

    /// 0.0 .. 1.0 progress within the current interval.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> Event {
        Event::Snapshot {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            running: self.running,
            completed: self.completed,
            cycle_count: self.cycle_count,
            cycle_progress: self.cycle_progress(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    /// Begin (or resume) counting down. No-op when already running.
    ///
    /// Issued during the grace window, this applies the pending
    /// transition immediately and starts the next interval; waiting out
    /// the grace delay is for the idle case, not for a user who already
    /// acted.
    pub fn start_at(&mut self, now: u64) -> Option<Event> {
        if self.running {
            return None;
        }
        if self.completed {
            self.apply_transition_at(now);
        }
        if !self.running {
            self.end_at_ms = Some(now.saturating_add(self.remaining_secs * 1000));
            self.running = true;
        }
        Some(Event::Started {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(now_ms())
    }

    /// Freeze the countdown. No-op when already paused. Cancels any
    /// pending deferred transition either way.
    pub fn pause_at(&mut self, now: u64) -> Option<Event> {
        self.transition_due_ms = None;
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_at(now);
        self.end_at_ms = None;
        self.running = false;
        Some(Event::Paused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        self.toggle_at(now_ms())
    }

    pub fn toggle_at(&mut self, now: u64) -> Option<Event> {
        if self.running {
            self.pause_at(now)
        } else {
            self.start_at(now)
        }
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.reset_at(now_ms())
    }

    /// Stop and restore the full duration of the current mode. Cancels
    /// any pending deferred transition; the cycle count is untouched.
    pub fn reset_at(&mut self, now: u64) -> Option<Event> {
        self.pause_at(now);
        self.completed = false;
        self.remaining_secs = self.settings.duration_secs(self.mode);
        Some(Event::Reset {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Switch interval type without touching the cycle count.
    ///
    /// Contract: the caller follows with `reset()` so the old mode's
    /// countdown is not carried into the new mode. Any pending deferred
    /// transition is cancelled here so it cannot override the choice.
    pub fn select_mode(&mut self, mode: Mode) -> Option<Event> {
        self.transition_due_ms = None;
        self.mode = mode;
        Some(Event::ModeSelected {
            mode,
            at: Utc::now(),
        })
    }

    /// Apply a new settings snapshot. An unchanged snapshot is a no-op,
    /// so re-handing the clock its current settings never disturbs a
    /// paused countdown.
    ///
    /// On a change while idle, the countdown reinitializes for the
    /// current mode under the new durations. While running (or inside
    /// the grace window) the in-flight interval is left untouched until
    /// the next transition or manual reset.
    pub fn set_settings(&mut self, settings: TimerSettings) {
        let settings = settings.sanitized();
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        if !self.running && !self.completed {
            self.remaining_secs = self.settings.duration_secs(self.mode);
        }
    }

    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    /// Periodic wake-up. Recomputes the countdown from the absolute end
    /// timestamp, emits [`Event::Completed`] exactly once when an
    /// interval runs out, and applies the deferred transition once its
    /// deadline passes.
    pub fn tick_at(&mut self, now: u64) -> Option<Event> {
        if let Some(due) = self.transition_due_ms {
            if now >= due {
                return Some(self.apply_transition_at(now));
            }
            return None;
        }
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_at(now);
        if self.remaining_secs > 0 {
            return None;
        }
        // Interval done: freeze, open the grace window, emit the
        // one-shot completion event.
        self.running = false;
        self.completed = true;
        self.end_at_ms = None;
        self.transition_due_ms = Some(now.saturating_add(self.settings.completion_grace_ms));
        Some(Event::Completed {
            mode: self.mode,
            duration_min: self.settings.duration_min(self.mode),
            cycle_count: self.cycle_count,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Ceiling-rounded seconds until the end timestamp. A partially
    /// elapsed second still counts as one second remaining, so the
    /// display never hits zero a tick early.
    fn remaining_at(&self, now: u64) -> u64 {
        match self.end_at_ms {
            Some(end) => end.saturating_sub(now).div_ceil(1000),
            None => self.remaining_secs,
        }
    }

    /// The mode-transition rule. Clears the grace window, moves to the
    /// next mode, updates the cycle count, and honors the auto-start
    /// flags.
    fn apply_transition_at(&mut self, now: u64) -> Event {
        self.transition_due_ms = None;
        self.completed = false;
        let from = self.mode;
        let (next, cycle) = match self.mode {
            Mode::Focus => {
                if self.cycle_count % self.settings.long_break_interval == 0 {
                    (Mode::LongBreak, self.cycle_count)
                } else {
                    (Mode::ShortBreak, self.cycle_count)
                }
            }
            Mode::ShortBreak => (Mode::Focus, self.cycle_count + 1),
            Mode::LongBreak => (Mode::Focus, 1),
        };
        self.mode = next;
        self.cycle_count = cycle;
        self.remaining_secs = self.settings.duration_secs(next);
        let auto_start = if next == Mode::Focus {
            self.settings.auto_start_pomodoros
        } else {
            self.settings.auto_start_breaks
        };
        if auto_start {
            self.end_at_ms = Some(now.saturating_add(self.remaining_secs * 1000));
            self.running = true;
        }
        Event::ModeChanged {
            from,
            to: next,
            cycle_count: cycle,
            auto_started: auto_start,
            at: Utc::now(),
        }
    }
}

fn cycle_progress_for(cycle_count: u32, interval: u32) -> u32 {
    // Cycle counts start at 1; a hand-edited snapshot may not.
    ((cycle_count.max(1) - 1) % interval.max(1)) + 1
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T0: u64 = 1_700_000_000_000;

    fn minutes(focus: u32, short: u32, long: u32) -> TimerSettings {
        TimerSettings {
            focus_min: focus,
            short_break_min: short,
            long_break_min: long,
            ..Default::default()
        }
    }

    /// Run `clock` through the current interval: start, jump past the
    /// end, then past the grace deadline. Returns the completion event.
    fn complete_interval(clock: &mut SessionClock, now: &mut u64) -> Event {
        clock.start_at(*now);
        *now += clock.remaining_secs() * 1000;
        let done = clock.tick_at(*now).expect("interval should complete");
        assert!(matches!(done, Event::Completed { .. }));
        *now += clock.settings().completion_grace_ms;
        let changed = clock.tick_at(*now).expect("transition should fire");
        assert!(matches!(changed, Event::ModeChanged { .. }));
        done
    }

    #[test]
    fn new_clock_starts_idle_in_focus() {
        let clock = SessionClock::new(minutes(25, 5, 15));
        assert_eq!(clock.mode(), Mode::Focus);
        assert_eq!(clock.remaining_secs(), 25 * 60);
        assert_eq!(clock.cycle_count(), 1);
        assert!(!clock.is_running());
        assert!(!clock.is_completed());
    }

    #[test]
    fn reset_restores_full_duration() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        clock.tick_at(T0 + 90_000);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 90);
        clock.reset_at(T0 + 95_000);
        assert_eq!(clock.remaining_secs(), 25 * 60);
        assert!(!clock.is_running());
    }

    #[test]
    fn remaining_uses_ceiling_rounding() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        // Half a second in: the partially elapsed second still counts.
        clock.tick_at(T0 + 500);
        assert_eq!(clock.remaining_secs(), 25 * 60);
        clock.tick_at(T0 + 1000);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 1);
        // A millisecond into the next second rounds up again.
        clock.tick_at(T0 + 1001);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 1);
        clock.tick_at(T0 + 2000);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 2);
    }

    #[test]
    fn pause_is_idempotent() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        assert!(clock.pause_at(T0 + 10_000).is_some());
        let frozen = clock.remaining_secs();
        assert_eq!(frozen, 25 * 60 - 10);
        // A second pause much later changes nothing.
        assert!(clock.pause_at(T0 + 500_000).is_none());
        assert_eq!(clock.remaining_secs(), frozen);
    }

    #[test]
    fn start_while_running_is_a_noop() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        assert!(clock.start_at(T0).is_some());
        assert!(clock.start_at(T0 + 5_000).is_none());
        clock.tick_at(T0 + 10_000);
        // End timestamp was not rebased by the redundant start.
        assert_eq!(clock.remaining_secs(), 25 * 60 - 10);
    }

    #[test]
    fn delayed_wakeup_loses_no_time() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        // No intermediate ticks at all for ten minutes.
        clock.tick_at(T0 + 600_000);
        assert_eq!(clock.remaining_secs(), 15 * 60);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        let done = clock.tick_at(T0 + 60_000);
        assert!(matches!(done, Some(Event::Completed { .. })));
        assert!(clock.is_completed());
        assert_eq!(clock.remaining_secs(), 0);
        assert!(!clock.is_running());
        // Repeated wake-ups inside the grace window emit nothing more.
        assert!(clock.tick_at(T0 + 60_200).is_none());
        assert!(clock.tick_at(T0 + 61_000).is_none());
        // The deadline passes: the transition fires, once.
        let changed = clock.tick_at(T0 + 61_500);
        assert!(matches!(changed, Some(Event::ModeChanged { .. })));
        assert!(clock.tick_at(T0 + 62_000).is_none());
    }

    #[test]
    fn completion_overshoot_still_completes() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        // First wake-up long after the deadline (suspended host).
        let done = clock.tick_at(T0 + 600_000);
        assert!(matches!(done, Some(Event::Completed { .. })));
    }

    #[test]
    fn transition_walk_with_interval_four() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        let mut now = T0;

        for expected_cycle in 1..=3u32 {
            assert_eq!(clock.mode(), Mode::Focus);
            assert_eq!(clock.cycle_count(), expected_cycle);
            complete_interval(&mut clock, &mut now);
            assert_eq!(clock.mode(), Mode::ShortBreak);
            assert_eq!(clock.cycle_count(), expected_cycle);
            complete_interval(&mut clock, &mut now);
            assert_eq!(clock.mode(), Mode::Focus);
            assert_eq!(clock.cycle_count(), expected_cycle + 1);
        }

        // Fourth focus session routes to the long break.
        assert_eq!(clock.cycle_count(), 4);
        complete_interval(&mut clock, &mut now);
        assert_eq!(clock.mode(), Mode::LongBreak);
        assert_eq!(clock.cycle_count(), 4);
        complete_interval(&mut clock, &mut now);
        assert_eq!(clock.mode(), Mode::Focus);
        assert_eq!(clock.cycle_count(), 1);
    }

    #[test]
    fn reset_during_grace_cancels_transition() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        clock.tick_at(T0 + 60_000);
        assert!(clock.is_completed());
        clock.reset_at(T0 + 60_500);
        assert!(!clock.is_completed());
        assert_eq!(clock.remaining_secs(), 60);
        // Well past the original deadline: nothing fires.
        assert!(clock.tick_at(T0 + 120_000).is_none());
        assert_eq!(clock.mode(), Mode::Focus);
        assert_eq!(clock.remaining_secs(), 60);
    }

    #[test]
    fn select_mode_during_grace_cancels_transition() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        clock.tick_at(T0 + 60_000);
        clock.select_mode(Mode::LongBreak);
        clock.reset_at(T0 + 60_200);
        assert!(clock.tick_at(T0 + 120_000).is_none());
        assert_eq!(clock.mode(), Mode::LongBreak);
        assert_eq!(clock.remaining_secs(), 15 * 60);
        assert_eq!(clock.cycle_count(), 1);
    }

    #[test]
    fn auto_start_breaks_runs_into_the_break() {
        let settings = TimerSettings {
            focus_min: 1,
            auto_start_breaks: true,
            ..Default::default()
        };
        let mut clock = SessionClock::new(settings);
        clock.start_at(T0);
        clock.tick_at(T0 + 60_000);
        let changed = clock.tick_at(T0 + 61_500);
        match changed {
            Some(Event::ModeChanged { to, auto_started, .. }) => {
                assert_eq!(to, Mode::ShortBreak);
                assert!(auto_started);
            }
            other => panic!("expected ModeChanged, got {other:?}"),
        }
        assert!(clock.is_running());
        // The break counts down from its own full duration.
        clock.tick_at(T0 + 61_500 + 10_000);
        assert_eq!(clock.remaining_secs(), 5 * 60 - 10);
    }

    #[test]
    fn manual_break_stays_paused_without_auto_start() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        clock.tick_at(T0 + 60_000);
        clock.tick_at(T0 + 61_500);
        assert_eq!(clock.mode(), Mode::ShortBreak);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining_secs(), 5 * 60);
    }

    #[test]
    fn start_during_grace_applies_transition_eagerly() {
        let mut clock = SessionClock::new(minutes(1, 5, 15));
        clock.start_at(T0);
        clock.tick_at(T0 + 60_000);
        assert!(clock.is_completed());
        let started = clock.start_at(T0 + 60_300);
        assert!(matches!(started, Some(Event::Started { .. })));
        assert_eq!(clock.mode(), Mode::ShortBreak);
        assert!(clock.is_running());
        assert!(!clock.is_completed());
        // The superseded deadline must not fire a second transition.
        clock.tick_at(T0 + 62_000);
        assert_eq!(clock.mode(), Mode::ShortBreak);
        // 1.7s into the break, ceiling-rounded.
        assert_eq!(clock.remaining_secs(), 5 * 60 - 1);
    }

    #[test]
    fn settings_apply_immediately_while_idle() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.set_settings(minutes(50, 10, 20));
        assert_eq!(clock.remaining_secs(), 50 * 60);
    }

    #[test]
    fn unchanged_settings_leave_paused_countdown_alone() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        clock.pause_at(T0 + 30_000);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 30);
        clock.set_settings(minutes(25, 5, 15));
        assert_eq!(clock.remaining_secs(), 25 * 60 - 30);
    }

    #[test]
    fn settings_leave_running_interval_untouched() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        clock.set_settings(minutes(50, 10, 20));
        clock.tick_at(T0 + 60_000);
        assert_eq!(clock.remaining_secs(), 25 * 60 - 60);
        // The next reset picks up the new duration.
        clock.reset_at(T0 + 61_000);
        assert_eq!(clock.remaining_secs(), 50 * 60);
    }

    #[test]
    fn select_mode_keeps_cycle_count() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        let mut now = T0;
        complete_interval(&mut clock, &mut now); // -> short break
        complete_interval(&mut clock, &mut now); // -> focus, cycle 2
        assert_eq!(clock.cycle_count(), 2);
        clock.select_mode(Mode::LongBreak);
        clock.reset_at(now);
        assert_eq!(clock.cycle_count(), 2);
        assert_eq!(clock.remaining_secs(), 15 * 60);
    }

    #[test]
    fn serde_round_trip_preserves_countdown() {
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        let json = serde_json::to_string(&clock).unwrap();
        let mut restored: SessionClock = serde_json::from_str(&json).unwrap();
        restored.tick_at(T0 + 120_000);
        assert_eq!(restored.remaining_secs(), 25 * 60 - 120);
        assert!(restored.is_running());
    }

    #[test]
    fn zero_cycle_count_in_snapshot_is_tolerated() {
        // A hand-edited kv snapshot may carry a cycle count below one.
        let mut clock = SessionClock::new(minutes(25, 5, 15));
        clock.start_at(T0);
        let json = serde_json::to_string(&clock)
            .unwrap()
            .replace("\"cycle_count\":1", "\"cycle_count\":0");
        let restored: SessionClock = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cycle_progress(), 1);
    }

    proptest! {
        #[test]
        fn cycle_progress_stays_in_range(cycle in 0u32..10_000, interval in 1u32..64) {
            let p = cycle_progress_for(cycle, interval);
            prop_assert!(p >= 1 && p <= interval);
        }

        #[test]
        fn remaining_never_exceeds_total_after_start(
            focus in 1u32..240,
            elapsed_ms in 0u64..20_000_000,
        ) {
            let mut clock = SessionClock::new(minutes(focus, 5, 15));
            clock.start_at(T0);
            clock.tick_at(T0 + elapsed_ms);
            prop_assert!(clock.remaining_secs() <= clock.total_secs());
        }
    }
}
