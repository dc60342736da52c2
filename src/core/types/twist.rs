//! Velocity command type.

use serde::{Deserialize, Serialize};

/// Planar velocity command sent to the drive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    /// Forward velocity in m/s
    pub linear: f32,
    /// Rotation rate in rad/s (positive = counter-clockwise)
    pub angular: f32,
}

impl Twist2D {
    /// Create a new velocity command.
    #[inline]
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Zero command that brings the robot to rest.
    #[inline]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Whether this command requests no motion.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}
