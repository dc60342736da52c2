//! Pausable playback clock.
//!
//! Maps wall-clock time to "sim time", the position along the recorded
//! trajectory. Sim time only advances while playback is running, so pausing
//! the robot also freezes where it is on the teach run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of wall-clock instants.
pub trait TimeSource {
    /// Current wall-clock instant.
    fn now(&self) -> Instant;
}

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl TimeSource for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for deterministic tests and offline runs.
///
/// Clones share the same time, so a test can keep one handle and advance
/// the clock owned by a replay loop.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.offset_ns
            .fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
    }
}

/// Wall-clock to sim-time mapping.
///
/// `now_us() = base + (running ? wall_now - resume_mark : 0)`
#[derive(Debug)]
pub struct PlaybackClock<C: TimeSource = MonotonicClock> {
    source: C,
    /// Sim time accumulated over all finished play intervals
    base: Duration,
    /// Wall instant of the last resume; `Some` while running
    resumed_at: Option<Instant>,
}

impl<C: TimeSource> PlaybackClock<C> {
    /// Create a paused clock at sim time zero.
    pub fn new(source: C) -> Self {
        Self {
            source,
            base: Duration::ZERO,
            resumed_at: None,
        }
    }

    /// Current sim time.
    pub fn now(&self) -> Duration {
        match self.resumed_at {
            Some(mark) => self.base + self.source.now().saturating_duration_since(mark),
            None => self.base,
        }
    }

    /// Current sim time in microseconds.
    #[inline]
    pub fn now_us(&self) -> u64 {
        self.now().as_micros() as u64
    }

    /// Whether sim time is advancing.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    /// Fold the running interval into the base and stop advancing.
    pub fn pause(&mut self) {
        match self.resumed_at.take() {
            Some(mark) => {
                self.base += self.source.now().saturating_duration_since(mark);
            }
            None => tracing::warn!("Playback clock paused while already paused"),
        }
    }

    /// Start advancing from the current wall instant.
    pub fn resume(&mut self) {
        if self.resumed_at.is_some() {
            tracing::warn!("Playback clock resumed while already running");
            return;
        }
        self.resumed_at = Some(self.source.now());
    }
}
