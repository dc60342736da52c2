//! Output side of the replay engine.
//!
//! The replay loop and the correction workers publish through a
//! [`ReplaySink`]. Transports (robot drive link, monitoring streams) plug in
//! by implementing it.

use parking_lot::Mutex;

use crate::core::types::{Pose2D, Twist2D};
use crate::correction::ControlError;

/// Notification that the tracked anchor changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSwitch {
    /// Sim time of the switch in microseconds
    pub stamp_us: u64,
    /// Name of the anchor now being tracked
    pub anchor: String,
}

/// Destination for everything the replay engine publishes.
///
/// Called from the replay thread and from correction workers.
pub trait ReplaySink: Send + Sync {
    /// Velocity command for the drive (corrected, or idle on stop/error).
    fn publish_command(&self, command: Twist2D);

    /// Where the robot should be right now on the taught trajectory.
    fn publish_reference_pose(&self, pose: Pose2D);

    /// The tracked anchor changed.
    fn publish_anchor_switch(&self, switch: AnchorSwitch);

    /// Error measured by a successful alignment.
    fn publish_control_error(&self, error: ControlError);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReplaySink for TracingSink {
    fn publish_command(&self, command: Twist2D) {
        tracing::trace!(
            "Command: linear={:.3} m/s, angular={:.3} rad/s",
            command.linear,
            command.angular
        );
    }

    fn publish_reference_pose(&self, pose: Pose2D) {
        tracing::trace!(
            "Reference pose: ({:.2}, {:.2}, {:.1}°)",
            pose.x,
            pose.y,
            pose.theta.to_degrees()
        );
    }

    fn publish_anchor_switch(&self, switch: AnchorSwitch) {
        tracing::info!(
            "Anchor switch at {:.2}s: {}",
            switch.stamp_us as f64 / 1e6,
            switch.anchor
        );
    }

    fn publish_control_error(&self, error: ControlError) {
        tracing::debug!(
            "Control error: along={:.3}m, lateral={:.3}m, heading={:.2}°",
            error.along_track,
            error.lateral,
            error.heading.to_degrees()
        );
    }
}

/// Sink that keeps every published output in memory.
///
/// Used for offline evaluation of a replay and in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    commands: Mutex<Vec<Twist2D>>,
    reference_poses: Mutex<Vec<Pose2D>>,
    anchor_switches: Mutex<Vec<AnchorSwitch>>,
    control_errors: Mutex<Vec<ControlError>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Published commands, in order.
    pub fn commands(&self) -> Vec<Twist2D> {
        self.commands.lock().clone()
    }

    /// Published reference poses, in order.
    pub fn reference_poses(&self) -> Vec<Pose2D> {
        self.reference_poses.lock().clone()
    }

    /// Published anchor switches, in order.
    pub fn anchor_switches(&self) -> Vec<AnchorSwitch> {
        self.anchor_switches.lock().clone()
    }

    /// Published control errors, in order.
    pub fn control_errors(&self) -> Vec<ControlError> {
        self.control_errors.lock().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.commands.lock().clear();
        self.reference_poses.lock().clear();
        self.anchor_switches.lock().clear();
        self.control_errors.lock().clear();
    }
}

impl ReplaySink for MemorySink {
    fn publish_command(&self, command: Twist2D) {
        self.commands.lock().push(command);
    }

    fn publish_reference_pose(&self, pose: Pose2D) {
        self.reference_poses.lock().push(pose);
    }

    fn publish_anchor_switch(&self, switch: AnchorSwitch) {
        self.anchor_switches.lock().push(switch);
    }

    fn publish_control_error(&self, error: ControlError) {
        self.control_errors.lock().push(error);
    }
}
