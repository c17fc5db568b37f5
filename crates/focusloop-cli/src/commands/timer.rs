use clap::{Subcommand, ValueEnum};
use std::io::Write;
use std::time::Duration;

use focusloop_core::{CompletionHooks, Config, Database, Event, Mode, SessionClock};

use crate::collab::build_hooks;

/// Key under which the serialized clock lives in the kv store. The
/// clock is wall-clock anchored, so a countdown started by one
/// invocation stays accurate when the next one picks it up.
const CLOCK_KEY: &str = "session_clock";

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Focus,
    ShortBreak,
    LongBreak,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Focus => Mode::Focus,
            ModeArg::ShortBreak => Mode::ShortBreak,
            ModeArg::LongBreak => Mode::LongBreak,
        }
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or resume) the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Pause if running, start otherwise
    Toggle,
    /// Restore the full duration of the current mode
    Reset,
    /// Switch interval type (resets the countdown for the new mode)
    Select {
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Print the current clock state as JSON
    Status,
    /// Run the countdown in the foreground until interrupted
    Watch,
}

fn load_clock(db: &Database, config: &Config) -> SessionClock {
    if let Ok(Some(json)) = db.kv_get(CLOCK_KEY) {
        if let Ok(mut clock) = serde_json::from_str::<SessionClock>(&json) {
            // Pick up any config edits made since the clock was saved;
            // a running interval is left untouched per the settings
            // contract.
            clock.set_settings(config.timer.clone());
            return clock;
        }
    }
    SessionClock::new(config.timer.clone())
}

fn save_clock(db: &Database, clock: &SessionClock) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(clock)?;
    db.kv_set(CLOCK_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let mut clock = load_clock(&db, &config);
    let mut hooks = build_hooks(&config);

    // Catch up on wall-clock time before acting so a countdown that
    // ran out between invocations completes and fires its hooks
    // instead of being frozen at zero by the command below.
    if let Some(event) = clock.tick() {
        hooks.dispatch(&event);
        print_event(&event)?;
    }

    match action {
        TimerAction::Start => match clock.start() {
            Some(event) => print_event(&event)?,
            None => print_event(&clock.snapshot())?,
        },
        TimerAction::Pause => match clock.pause() {
            Some(event) => print_event(&event)?,
            None => print_event(&clock.snapshot())?,
        },
        TimerAction::Toggle => match clock.toggle() {
            Some(event) => print_event(&event)?,
            None => print_event(&clock.snapshot())?,
        },
        TimerAction::Reset => {
            if let Some(event) = clock.reset() {
                print_event(&event)?;
            }
        }
        TimerAction::Select { mode } => {
            clock.select_mode(mode.into());
            // Selecting a mode must not keep counting the old mode's
            // remaining time against the new one.
            clock.reset();
            print_event(&clock.snapshot())?;
        }
        TimerAction::Status => {
            print_event(&clock.snapshot())?;
        }
        TimerAction::Watch => {
            watch(&db, &mut clock, &mut hooks)?;
        }
    }

    save_clock(&db, &clock)?;
    Ok(())
}

/// Foreground wake-up loop. Ticks the clock a few times a second,
/// prints completion and transition events as JSON lines, and keeps a
/// one-line countdown on screen. Exits on ctrl-c.
fn watch(
    db: &Database,
    clock: &mut SessionClock,
    hooks: &mut CompletionHooks,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(event) = clock.tick() {
                        hooks.dispatch(&event);
                        println!();
                        if let Ok(line) = serde_json::to_string(&event) {
                            println!("{line}");
                        }
                        if let Err(e) = save_clock(db, clock) {
                            tracing::warn!(error = %e, "failed to persist clock");
                        }
                    }
                    let secs = clock.remaining_secs();
                    let state = if clock.is_running() {
                        "running"
                    } else if clock.is_completed() {
                        "done"
                    } else {
                        "paused"
                    };
                    print!(
                        "\r{} {}/{}  {:02}:{:02}  [{state}]   ",
                        clock.mode().label(),
                        clock.cycle_progress(),
                        clock.settings().long_break_interval,
                        secs / 60,
                        secs % 60,
                    );
                    let _ = std::io::stdout().flush();
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            }
        }
    });

    Ok(())
}
