//! One-shot completion side effects.
//!
//! The clock itself never performs I/O; it emits [`Event::Completed`]
//! at most once per interval and this dispatcher fans the event out to
//! whatever collaborators the host wired up. Every call is
//! fire-and-forget: a failing collaborator is logged and dropped, it
//! can never stall or poison the state machine.

use crate::events::Event;
use crate::timer::Mode;

type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Statistics recorder. Always invoked on completion when present.
pub trait SessionSink {
    fn record(&mut self, mode: Mode, duration_min: u64, completed: bool) -> HookResult;
}

/// Completion chime.
pub trait SoundPlayer {
    fn play(&mut self) -> HookResult;
}

/// Desktop (or other) notification sender.
pub trait Notifier {
    fn notify(&mut self, mode: Mode) -> HookResult;
}

/// Collaborator set consulted on every completion event.
///
/// Hosts register only the collaborators the user enabled; a hook left
/// unset is simply skipped.
#[derive(Default)]
pub struct CompletionHooks {
    sink: Option<Box<dyn SessionSink>>,
    sound: Option<Box<dyn SoundPlayer>>,
    notifier: Option<Box<dyn Notifier>>,
}

impl CompletionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Box<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_sound(mut self, sound: Box<dyn SoundPlayer>) -> Self {
        self.sound = Some(sound);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Fan a clock event out to the collaborators. Only
    /// [`Event::Completed`] triggers anything; all other events pass
    /// through untouched.
    pub fn dispatch(&mut self, event: &Event) {
        let Event::Completed {
            mode, duration_min, ..
        } = event
        else {
            return;
        };
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.record(*mode, *duration_min, true) {
                tracing::warn!(error = %e, "session sink failed");
            }
        }
        if let Some(sound) = self.sound.as_mut() {
            if let Err(e) = sound.play() {
                tracing::warn!(error = %e, "completion sound failed");
            }
        }
        if let Some(notifier) = self.notifier.as_mut() {
            if let Err(e) = notifier.notify(*mode) {
                tracing::warn!(error = %e, "notification failed");
            }
        }
    }
}
