//! Trajectory playback layer.
//!
//! Pure, single-threaded building blocks driven by the replay loop:
//!
//! - [`clock`]: Pausable sim-time clock
//! - [`cursor`]: Forward-only lookup into recorded commands and poses
//! - [`anchors`]: Anchor point progression
//! - [`status`]: PAUSE/PLAY/ERROR transition table

pub mod anchors;
pub mod clock;
pub mod cursor;
pub mod status;

pub use anchors::{AnchorPoint, AnchorTrack};
pub use clock::{ManualClock, MonotonicClock, PlaybackClock, TimeSource};
pub use cursor::CursorSampler;
pub use status::{PlaybackEvent, PlaybackStateMachine, PlaybackStatus, Transition, transition};
