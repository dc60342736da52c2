//! Control error and correction reports.

use crate::core::types::Pose2D;
use crate::error::AlignmentError;

/// Deviation from the taught trajectory, measured at an anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlError {
    /// Error along the anchor's heading (meters)
    pub along_track: f32,
    /// Error perpendicular to the anchor's heading (meters)
    pub lateral: f32,
    /// Heading error (radians)
    pub heading: f32,
}

impl ControlError {
    /// Read the error off the transform returned by the alignment service.
    ///
    /// The transform is expressed in the anchor frame, so its translation
    /// splits directly into along-track and lateral components.
    pub fn from_alignment(transform: &Pose2D) -> Self {
        Self {
            along_track: transform.x,
            lateral: transform.y,
            heading: transform.theta,
        }
    }
}

/// Outcome of one alignment call, posted back to the replay loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionReport {
    /// Alignment succeeded; forward the error to the corrector.
    Error(ControlError),
    /// Alignment failed; playback must stop.
    Failed(AlignmentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_components_follow_transform() {
        let error = ControlError::from_alignment(&Pose2D::new(0.1, -0.05, 0.02));
        assert_eq!(error.along_track, 0.1);
        assert_eq!(error.lateral, -0.05);
        assert_eq!(error.heading, 0.02);
    }
}
