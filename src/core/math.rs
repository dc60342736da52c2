//! Mathematical primitives for planar poses.

use std::f32::consts::PI;

use crate::core::types::Pose2D;

/// Normalize angle to [-π, π].
///
/// # Example
/// ```
/// use dhruva_repeat::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-5);
/// assert!((normalize_angle(-2.5 * PI) + 0.5 * PI).abs() < 1e-5);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest angular difference from angle `a` to angle `b`.
///
/// Returns the signed angle you need to add to `a` to reach `b`,
/// taking the shortest path around the circle.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// Distance between two poses used to pick the closest anchor point.
///
/// Planar Euclidean distance plus `heading_weight` meters per radian of
/// heading difference. With a zero weight this is the plain position distance.
#[inline]
pub fn pose_distance(a: &Pose2D, b: &Pose2D, heading_weight: f32) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt() + heading_weight * angle_diff(a.theta, b.theta).abs()
}
