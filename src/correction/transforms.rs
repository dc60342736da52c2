//! Startup lookup of the sensor-to-robot transform.
//!
//! The transform is resolved once, before replay starts, and shared
//! read-only afterwards. Failing to resolve it within the configured bound
//! aborts startup.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{FrameConfig, RepeatConfig};
use crate::core::types::Pose2D;
use crate::error::{RepeatError, Result};

/// Interval between lookup attempts while waiting for a transform.
const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of coordinate frame transforms.
pub trait FrameTransformSource {
    /// Transform mapping `source_frame` coordinates into `target_frame`,
    /// if currently known.
    fn lookup(&self, target_frame: &str, source_frame: &str) -> Option<Pose2D>;
}

/// Fixed table of transforms.
#[derive(Debug, Clone, Default)]
pub struct StaticFrameTransforms {
    transforms: HashMap<(String, String), Pose2D>,
}

impl StaticFrameTransforms {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the configured sensor mount.
    pub fn from_config(config: &RepeatConfig) -> Self {
        Self::new().with_transform(
            &config.frames.robot,
            &config.frames.sensor,
            config.sensor_mount(),
        )
    }

    /// Register `source_frame` → `target_frame`.
    pub fn with_transform(mut self, target_frame: &str, source_frame: &str, pose: Pose2D) -> Self {
        self.transforms
            .insert((target_frame.to_string(), source_frame.to_string()), pose);
        self
    }
}

impl FrameTransformSource for StaticFrameTransforms {
    fn lookup(&self, target_frame: &str, source_frame: &str) -> Option<Pose2D> {
        if target_frame == source_frame {
            return Some(Pose2D::identity());
        }
        self.transforms
            .get(&(target_frame.to_string(), source_frame.to_string()))
            .copied()
    }
}

/// Resolve the sensor-to-robot transform named in `frames`.
pub fn resolve_sensor_transform(
    source: &dyn FrameTransformSource,
    frames: &FrameConfig,
) -> Result<Pose2D> {
    let timeout = Duration::from_millis(frames.transform_timeout_ms);
    let pose = wait_for_transform(source, &frames.robot, &frames.sensor, timeout)?;
    tracing::info!(
        "Sensor '{}' mounted at ({:.3}, {:.3}, {:.1}°) in '{}'",
        frames.sensor,
        pose.x,
        pose.y,
        pose.theta.to_degrees(),
        frames.robot
    );
    Ok(pose)
}

/// Poll `source` until the transform appears or `timeout` elapses.
pub fn wait_for_transform(
    source: &dyn FrameTransformSource,
    target_frame: &str,
    source_frame: &str,
    timeout: Duration,
) -> Result<Pose2D> {
    let start = Instant::now();
    loop {
        if let Some(pose) = source.lookup(target_frame, source_frame) {
            return Ok(pose);
        }

        let waited = start.elapsed();
        if waited >= timeout {
            return Err(RepeatError::TransformUnavailable {
                source_frame: source_frame.to_string(),
                target_frame: target_frame.to_string(),
                waited,
            });
        }

        std::thread::sleep(LOOKUP_POLL_INTERVAL.min(timeout - waited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Source that only knows the transform after a number of attempts.
    struct LateSource {
        attempts: AtomicU32,
        ready_after: u32,
    }

    impl FrameTransformSource for LateSource {
        fn lookup(&self, _target: &str, _source: &str) -> Option<Pose2D> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            (attempt >= self.ready_after).then(|| Pose2D::new(0.2, 0.0, 0.0))
        }
    }

    #[test]
    fn test_static_lookup() {
        let frames = FrameConfig::default();
        let source = StaticFrameTransforms::new().with_transform(
            &frames.robot,
            &frames.sensor,
            Pose2D::new(0.1, 0.0, 0.0),
        );
        let pose = resolve_sensor_transform(&source, &frames).unwrap();
        assert_eq!(pose, Pose2D::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn test_same_frame_is_identity() {
        let source = StaticFrameTransforms::new();
        assert_eq!(
            source.lookup("base_link", "base_link"),
            Some(Pose2D::identity())
        );
    }

    #[test]
    fn test_waits_for_late_transform() {
        let source = LateSource {
            attempts: AtomicU32::new(0),
            ready_after: 3,
        };
        let pose =
            wait_for_transform(&source, "base_link", "lidar", Duration::from_secs(1)).unwrap();
        assert_eq!(pose.x, 0.2);
        assert_eq!(source.attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_missing_transform_times_out() {
        let frames = FrameConfig {
            transform_timeout_ms: 30,
            ..FrameConfig::default()
        };
        let result = resolve_sensor_transform(&StaticFrameTransforms::new(), &frames);
        match result {
            Err(RepeatError::TransformUnavailable { waited, .. }) => {
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("Expected TransformUnavailable, got {:?}", other),
        }
    }
}
