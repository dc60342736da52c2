//! Alignment service interface.

use crate::core::types::{PointCloud2D, Pose2D};
use crate::error::AlignmentError;

/// One registration request.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentRequest<'a> {
    /// Anchor whose reference cloud is used
    pub anchor: &'a str,
    /// Live reading, already moved into the anchor frame
    pub reading: &'a PointCloud2D,
    /// Reference cloud recorded at the anchor
    pub reference: &'a PointCloud2D,
}

/// Point cloud registration capability.
///
/// Returns the rigid transform that moves `reading` onto `reference`.
/// Implementations may block; they run on correction worker threads.
pub trait AlignmentService: Send + Sync {
    fn align(&self, request: &AlignmentRequest<'_>) -> Result<Pose2D, AlignmentError>;
}

/// Stand-in used when no alignment backend is connected.
///
/// Rejects every request, so any reading drives playback into ERROR.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAlignment;

impl AlignmentService for OfflineAlignment {
    fn align(&self, request: &AlignmentRequest<'_>) -> Result<Pose2D, AlignmentError> {
        Err(AlignmentError::Unreachable(format!(
            "no alignment backend connected (anchor {})",
            request.anchor
        )))
    }
}
