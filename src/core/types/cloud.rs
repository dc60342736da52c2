//! Point cloud type.

use serde::{Deserialize, Serialize};

use super::{Point2D, Pose2D};

/// Collection of 2D points in Cartesian coordinates.
///
/// Structure-of-arrays layout. Used both for live sensor readings and for
/// the reference cloud recorded at each anchor point; the replay engine
/// treats the contents as opaque and only moves them between frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2D {
    /// X coordinates in meters
    pub xs: Vec<f32>,
    /// Y coordinates in meters
    pub ys: Vec<f32>,
}

impl PointCloud2D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points (converts AoS to SoA).
    pub fn from_points(points: Vec<Point2D>) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push_xy(p.x, p.y);
        }
        cloud
    }

    /// Add a point by x, y coordinates.
    #[inline]
    pub fn push_xy(&mut self, x: f32, y: f32) {
        self.xs.push(x);
        self.ys.push(y);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
    }

    /// Return a copy of this cloud with every point moved by `pose`.
    pub fn transform(&self, pose: &Pose2D) -> PointCloud2D {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        let mut result = PointCloud2D::with_capacity(self.len());
        for (&x, &y) in self.xs.iter().zip(self.ys.iter()) {
            result.push_xy(pose.x + x * cos_t - y * sin_t, pose.y + x * sin_t + y * cos_t);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_transform_matches_pose() {
        let cloud = PointCloud2D::from_points(vec![Point2D::new(1.0, 0.0), Point2D::new(0.0, 2.0)]);
        let pose = Pose2D::new(1.0, 1.0, PI);
        let moved = cloud.transform(&pose);

        assert_eq!(moved.len(), 2);
        for (original, transformed) in cloud.iter().zip(moved.iter()) {
            let expected = pose.transform_point(&original);
            assert_relative_eq!(transformed.x, expected.x, epsilon = 1e-6);
            assert_relative_eq!(transformed.y, expected.y, epsilon = 1e-6);
        }
    }
}
