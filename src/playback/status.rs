//! Playback status and its transition table.
//!
//! The table is a pure function so it can be checked in isolation; the
//! [`PlaybackStateMachine`] applies the resulting side effects to the clock
//! and the output sink.

use crate::core::types::Twist2D;
use crate::io::sink::ReplaySink;
use crate::playback::clock::{PlaybackClock, TimeSource};

/// Playback execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Sim time frozen, no commands published.
    #[default]
    Pause,
    /// Replaying recorded commands.
    Play,
    /// Halted after a correction failure; needs operator acknowledgement.
    Error,
}

impl PlaybackStatus {
    /// Convert to string for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Pause => "PAUSE",
            PlaybackStatus::Play => "PLAY",
            PlaybackStatus::Error => "ERROR",
        }
    }
}

/// Requests that may change the playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Operator asked to start playing.
    Start,
    /// Operator asked to stop playing.
    Stop,
    /// Correction pipeline failed.
    Fault,
    /// Operator acknowledged an error.
    Acknowledge,
}

/// Outcome of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// New status.
    pub to: PlaybackStatus,
    /// Start the playback clock.
    pub resume_clock: bool,
    /// Stop the playback clock.
    pub pause_clock: bool,
    /// Publish a single zero command.
    pub publish_idle: bool,
}

impl Transition {
    fn to(status: PlaybackStatus) -> Self {
        Self {
            to: status,
            resume_clock: false,
            pause_clock: false,
            publish_idle: false,
        }
    }
}

/// Transition table. `None` means the event has no effect in `status`.
///
/// | from  | event       | to    | effects                  |
/// |-------|-------------|-------|--------------------------|
/// | PAUSE | Start       | PLAY  | resume clock             |
/// | PLAY  | Stop        | PAUSE | pause clock, idle        |
/// | PLAY  | Fault       | ERROR | pause clock, idle        |
/// | PAUSE | Fault       | ERROR | idle                     |
/// | ERROR | Acknowledge | PAUSE | none                     |
pub fn transition(status: PlaybackStatus, event: PlaybackEvent) -> Option<Transition> {
    use PlaybackEvent::*;
    use PlaybackStatus::*;

    match (status, event) {
        (Pause, Start) => Some(Transition {
            resume_clock: true,
            ..Transition::to(Play)
        }),
        (Play, Stop) => Some(Transition {
            pause_clock: true,
            publish_idle: true,
            ..Transition::to(Pause)
        }),
        (Play, Fault) => Some(Transition {
            pause_clock: true,
            publish_idle: true,
            ..Transition::to(Error)
        }),
        (Pause, Fault) => Some(Transition {
            publish_idle: true,
            ..Transition::to(Error)
        }),
        (Error, Acknowledge) => Some(Transition::to(Pause)),
        _ => None,
    }
}

/// Holds the playback status and applies transition side effects.
#[derive(Debug, Default)]
pub struct PlaybackStateMachine {
    status: PlaybackStatus,
}

impl PlaybackStateMachine {
    /// Create a state machine in PAUSE.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[inline]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Apply `event`, returning the new status if it changed.
    pub fn handle<C: TimeSource>(
        &mut self,
        event: PlaybackEvent,
        clock: &mut PlaybackClock<C>,
        sink: &dyn ReplaySink,
    ) -> Option<PlaybackStatus> {
        let Some(step) = transition(self.status, event) else {
            tracing::debug!(
                "Ignoring {:?} while in {}",
                event,
                self.status.as_str()
            );
            return None;
        };

        match (self.status, step.to) {
            (_, PlaybackStatus::Error) => tracing::warn!("Switching to emergency mode."),
            (_, PlaybackStatus::Play) => tracing::info!("Starting playback."),
            (PlaybackStatus::Error, PlaybackStatus::Pause) => {
                tracing::info!("Attempting recovery.")
            }
            _ => tracing::info!("Stopping playback."),
        }

        if step.pause_clock {
            clock.pause();
            tracing::info!("Paused at: {:.3}s", clock.now().as_secs_f64());
        }
        if step.resume_clock {
            clock.resume();
        }
        if step.publish_idle {
            sink.publish_command(Twist2D::idle());
        }

        self.status = step.to;
        Some(step.to)
    }
}
