//! Generic timestamp wrapper.

use serde::{Deserialize, Serialize};

/// Generic timestamp wrapper for any data type.
///
/// Recorded trajectories use microseconds relative to the start of the
/// teach run, which is also the origin of playback sim time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }

    /// Create a timestamped value from a time in seconds.
    ///
    /// Negative times clamp to zero.
    #[inline]
    pub fn from_secs(data: T, secs: f64) -> Self {
        Self {
            data,
            timestamp_us: secs_to_us(secs),
        }
    }
}

/// Convert seconds to whole microseconds, clamping negatives to zero.
#[inline]
pub fn secs_to_us(secs: f64) -> u64 {
    if secs <= 0.0 {
        0
    } else {
        (secs * 1_000_000.0).round() as u64
    }
}
