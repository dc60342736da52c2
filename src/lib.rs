//! DhruvaRepeat - Teach-and-repeat trajectory replay for VacuumTiger
//!
//! Replays velocity commands recorded during a teach run while keeping the
//! robot on the taught path: live sensor readings are aligned against
//! reference clouds recorded at anchor points, and the resulting control
//! error is fed to a motion corrector.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Replay loop
//! │          (fixed-rate tick, inbox, summary)          │
//! └─────────────────────────────────────────────────────┘
//!            │                              │
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │     correction/      │      │      playback/       │
//! │ (admission gate,     │      │ (clock, cursors,     │
//! │  workers, reports)   │      │  anchors, status)    │
//! └──────────────────────┘      └──────────────────────┘
//!            │                              │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Teach files,
//! │              (teach, sink, console)                 │    outputs, operator
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Playback
//!
//! Sim time only advances in PLAY. Operator input moves playback between
//! PAUSE and PLAY; a failed alignment forces ERROR, which stops the robot
//! and must be acknowledged (back to PAUSE) before playing again.
//!
//! # Correction
//!
//! At most one alignment call is in flight. Readings that arrive while the
//! service is busy are dropped, so alignment latency never accumulates.

pub mod config;
pub mod core;
pub mod correction;
pub mod corrector;
pub mod error;
pub mod io;
pub mod playback;
pub mod threads;
pub mod utils;

pub use config::{RepeatConfig, RuntimeParams};
pub use crate::core::types::{Point2D, PointCloud2D, Pose2D, Timestamped, Twist2D};
pub use correction::{
    AlignmentRequest, AlignmentService, ControlError, CorrectionLoop, CorrectionReport,
    OfflineAlignment,
};
pub use corrector::{MotionCorrector, PassThroughCorrector};
pub use error::{AlignmentError, RepeatError, Result};
pub use io::{MemorySink, ReplaySink, TeachRecording, TracingSink};
pub use playback::{PlaybackStatus, TimeSource};
pub use threads::{OperatorInput, ReplayHandle, ReplayLoop, ReplaySummary};
