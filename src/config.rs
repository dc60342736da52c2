//! Configuration loading for DhruvaRepeat

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::types::Pose2D;
use crate::error::{RepeatError, Result};

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RepeatConfig {
    #[serde(default)]
    pub teach: TeachConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub anchors: AnchorConfig,
    #[serde(default)]
    pub frames: FrameConfig,
    #[serde(default)]
    pub sensor: SensorMountConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    /// Free-form parameters forwarded to the motion corrector
    #[serde(default)]
    pub corrector: BTreeMap<String, f64>,
}

/// Location of the recorded teach run
#[derive(Clone, Debug, Deserialize)]
pub struct TeachConfig {
    /// Directory holding the teach files (default: "teach")
    #[serde(default = "default_teach_dir")]
    pub directory: PathBuf,

    /// Recorded velocity commands (default: "speeds.sl")
    #[serde(default = "default_commands_file")]
    pub commands_file: String,

    /// Recorded reference poses (default: "positions.pl")
    #[serde(default = "default_positions_file")]
    pub positions_file: String,

    /// Anchor point list (default: "anchorPoints.apd")
    #[serde(default = "default_anchors_file")]
    pub anchors_file: String,
}

/// Replay loop settings
#[derive(Clone, Debug, Deserialize)]
pub struct ReplayConfig {
    /// Loop rate in Hz (default: 100)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,

    /// Initial command lookahead in seconds (default: 0.0)
    #[serde(default)]
    pub lookahead_secs: f64,

    /// Capacity of the operator/config/reading inbox (default: 64)
    #[serde(default = "default_input_capacity")]
    pub input_capacity: usize,
}

/// Anchor progression settings
#[derive(Clone, Debug, Deserialize)]
pub struct AnchorConfig {
    /// Meters of distance charged per radian of heading difference (default: 0.0)
    #[serde(default)]
    pub heading_weight: f32,
}

/// Coordinate frame names and the startup lookup bound
#[derive(Clone, Debug, Deserialize)]
pub struct FrameConfig {
    /// Robot body frame (default: "base_link")
    #[serde(default = "default_robot_frame")]
    pub robot: String,

    /// Sensor frame of incoming readings (default: "lidar")
    #[serde(default = "default_sensor_frame")]
    pub sensor: String,

    /// Time allowed to resolve sensor-to-robot at startup in ms (default: 5000)
    #[serde(default = "default_transform_timeout")]
    pub transform_timeout_ms: u64,
}

/// Static sensor mounting pose relative to the robot frame
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SensorMountConfig {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub theta: f32,
}

/// Correction pipeline settings
#[derive(Clone, Debug, Deserialize)]
pub struct CorrectionConfig {
    /// Alignment worker threads (default: 1)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the report channel back to the replay loop (default: 16)
    #[serde(default = "default_report_capacity")]
    pub report_capacity: usize,

    /// Results older than this are treated as failures (default: unbounded)
    #[serde(default)]
    pub alignment_timeout_ms: Option<u64>,
}

impl Default for TeachConfig {
    fn default() -> Self {
        Self {
            directory: default_teach_dir(),
            commands_file: default_commands_file(),
            positions_file: default_positions_file(),
            anchors_file: default_anchors_file(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            lookahead_secs: 0.0,
            input_capacity: default_input_capacity(),
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            heading_weight: 0.0,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            robot: default_robot_frame(),
            sensor: default_sensor_frame(),
            transform_timeout_ms: default_transform_timeout(),
        }
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            report_capacity: default_report_capacity(),
            alignment_timeout_ms: None,
        }
    }
}

// Default value functions
fn default_teach_dir() -> PathBuf {
    PathBuf::from("teach")
}
fn default_commands_file() -> String {
    "speeds.sl".to_string()
}
fn default_positions_file() -> String {
    "positions.pl".to_string()
}
fn default_anchors_file() -> String {
    "anchorPoints.apd".to_string()
}
fn default_rate_hz() -> f32 {
    100.0
}
fn default_input_capacity() -> usize {
    64
}
fn default_robot_frame() -> String {
    "base_link".to_string()
}
fn default_sensor_frame() -> String {
    "lidar".to_string()
}
fn default_transform_timeout() -> u64 {
    5000
}
fn default_workers() -> usize {
    1
}
fn default_report_capacity() -> usize {
    16
}

impl RepeatConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RepeatError::Config(format!("Failed to read config file: {}", e)))?;
        let config: RepeatConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the replay loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.replay.rate_hz.is_finite() && self.replay.rate_hz > 0.0) {
            return Err(RepeatError::Config(format!(
                "replay.rate_hz must be positive and finite, got {}",
                self.replay.rate_hz
            )));
        }
        if !(self.replay.lookahead_secs.is_finite() && self.replay.lookahead_secs >= 0.0) {
            return Err(RepeatError::Config(format!(
                "replay.lookahead_secs must be finite and not negative, got {}",
                self.replay.lookahead_secs
            )));
        }
        if self.correction.workers == 0 {
            return Err(RepeatError::Config(
                "correction.workers must be at least 1".to_string(),
            ));
        }
        if self.replay.input_capacity == 0 || self.correction.report_capacity == 0 {
            return Err(RepeatError::Config(
                "channel capacities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parameters in effect when replay starts.
    pub fn runtime_params(&self) -> RuntimeParams {
        RuntimeParams {
            lookahead_secs: self.replay.lookahead_secs,
            corrector: self.corrector.clone(),
        }
    }

    /// Tick period derived from the loop rate.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.replay.rate_hz as f64)
    }

    /// Sensor mounting pose as a transform from sensor to robot frame.
    pub fn sensor_mount(&self) -> Pose2D {
        Pose2D::new(self.sensor.x, self.sensor.y, self.sensor.theta)
    }
}

/// Parameters that may change while replay is running.
///
/// The lookahead is consumed by the replay loop; the whole set is
/// forwarded to the motion corrector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeParams {
    /// Command lookahead in seconds
    pub lookahead_secs: f64,
    /// Corrector-specific parameters
    pub corrector: BTreeMap<String, f64>,
}
