//! Anchor points along the taught trajectory.
//!
//! Each anchor carries the pose and the point cloud recorded at that spot
//! during the teach run. Live readings are aligned against the cloud of the
//! anchor the robot is currently closest to.

use std::sync::Arc;

use crate::core::math::pose_distance;
use crate::core::types::{PointCloud2D, Pose2D};
use crate::error::{RepeatError, Result};

/// Named waypoint with its reference pose and reference cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPoint {
    name: String,
    pose: Pose2D,
    cloud: PointCloud2D,
}

impl AnchorPoint {
    /// Create an anchor point.
    pub fn new(name: impl Into<String>, pose: Pose2D, cloud: PointCloud2D) -> Self {
        Self {
            name: name.into(),
            pose,
            cloud,
        }
    }

    /// Anchor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference pose in the world frame.
    pub fn pose(&self) -> &Pose2D {
        &self.pose
    }

    /// Reference cloud, expressed in the anchor frame.
    pub fn cloud(&self) -> &PointCloud2D {
        &self.cloud
    }
}

/// Ordered anchors with a forward-only cursor.
#[derive(Debug, Clone)]
pub struct AnchorTrack {
    anchors: Vec<Arc<AnchorPoint>>,
    cursor: usize,
    heading_weight: f32,
}

impl AnchorTrack {
    /// Create a track starting at the first anchor.
    pub fn new(anchors: Vec<AnchorPoint>, heading_weight: f32) -> Result<Self> {
        if anchors.is_empty() {
            return Err(RepeatError::Config(
                "Anchor point sequence is empty".to_string(),
            ));
        }

        Ok(Self {
            anchors: anchors.into_iter().map(Arc::new).collect(),
            cursor: 0,
            heading_weight,
        })
    }

    /// Anchor the robot is currently tracking.
    pub fn current_anchor(&self) -> &Arc<AnchorPoint> {
        &self.anchors[self.cursor]
    }

    /// Cursor index.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Always false; an empty track cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Step to the next anchor if `robot_pose` is at least as close to it
    /// as to the current one.
    ///
    /// Moves at most one anchor per call. Returns the new anchor name when
    /// the cursor moved.
    pub fn advance_if_closer(&mut self, robot_pose: &Pose2D) -> Option<&str> {
        let next = self.anchors.get(self.cursor + 1)?;

        let current = &self.anchors[self.cursor];
        let to_current = pose_distance(robot_pose, current.pose(), self.heading_weight);
        let to_next = pose_distance(robot_pose, next.pose(), self.heading_weight);

        if to_current >= to_next {
            self.cursor += 1;
            Some(self.anchors[self.cursor].name())
        } else {
            None
        }
    }
}
