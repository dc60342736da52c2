//! Loader for a recorded teach run.
//!
//! A teach directory holds three whitespace-separated text files plus one
//! point cloud per anchor:
//!
//! ```text
//! teach/
//! ├── speeds.sl           # t_secs linear angular
//! ├── positions.pl        # t_secs x y theta
//! ├── anchorPoints.apd   # name x y theta
//! └── <name>.cloud        # x y, in the anchor frame
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::TeachConfig;
use crate::core::types::{PointCloud2D, Pose2D, Timestamped, Twist2D};
use crate::error::{RepeatError, Result};
use crate::playback::AnchorPoint;

/// Extension of per-anchor reference cloud files.
pub const CLOUD_EXTENSION: &str = "cloud";

/// Everything recorded during a teach run.
#[derive(Debug, Clone)]
pub struct TeachRecording {
    /// Velocity commands, sorted by time
    pub commands: Vec<Timestamped<Twist2D>>,
    /// Reference poses, sorted by time
    pub positions: Vec<Timestamped<Pose2D>>,
    /// Anchor points in travel order
    pub anchors: Vec<AnchorPoint>,
}

impl TeachRecording {
    /// Load the recording described by `config`.
    pub fn load(config: &TeachConfig) -> Result<Self> {
        let dir = &config.directory;
        if !dir.is_dir() {
            return Err(RepeatError::Config(format!(
                "Teach directory {:?} does not exist",
                dir
            )));
        }

        let commands = load_commands(&dir.join(&config.commands_file))?;
        let positions = load_positions(&dir.join(&config.positions_file))?;
        let anchors = load_anchors(dir, &config.anchors_file)?;

        let recording = Self {
            commands,
            positions,
            anchors,
        };
        tracing::info!(
            "Loaded teach run from {:?}: {} commands, {} poses, {} anchors, {:.1}s",
            dir,
            recording.commands.len(),
            recording.positions.len(),
            recording.anchors.len(),
            recording.duration_us() as f64 / 1e6
        );
        Ok(recording)
    }

    /// Time of the last recorded command.
    pub fn duration_us(&self) -> u64 {
        self.commands.last().map(|c| c.timestamp_us).unwrap_or(0)
    }
}

/// Load `t linear angular` records.
pub fn load_commands(path: &Path) -> Result<Vec<Timestamped<Twist2D>>> {
    let mut commands = Vec::new();
    for record in read_records(path, 3)? {
        let t = record.f64(0)?;
        let command = Twist2D::new(record.f32(1)?, record.f32(2)?);
        commands.push(Timestamped::from_secs(command, t));
    }
    check_sequence(path, &commands)?;
    Ok(commands)
}

/// Load `t x y theta` records.
pub fn load_positions(path: &Path) -> Result<Vec<Timestamped<Pose2D>>> {
    let mut positions = Vec::new();
    for record in read_records(path, 4)? {
        let t = record.f64(0)?;
        let pose = Pose2D::new(record.f32(1)?, record.f32(2)?, record.f32(3)?);
        positions.push(Timestamped::from_secs(pose, t));
    }
    check_sequence(path, &positions)?;
    Ok(positions)
}

/// Load `name x y theta` records and each anchor's reference cloud.
pub fn load_anchors(dir: &Path, anchors_file: &str) -> Result<Vec<AnchorPoint>> {
    let path = dir.join(anchors_file);
    let mut anchors = Vec::new();
    for record in read_records(&path, 4)? {
        let name = record.fields[0].clone();
        if name.contains(['/', '\\']) {
            return Err(record.error(format!("invalid anchor name '{}'", name)));
        }
        let pose = Pose2D::new(record.f32(1)?, record.f32(2)?, record.f32(3)?);
        let cloud = load_point_cloud(&cloud_path(dir, &name))?;
        if cloud.is_empty() {
            tracing::warn!("Anchor '{}' has an empty reference cloud", name);
        }
        anchors.push(AnchorPoint::new(name, pose, cloud));
    }

    if anchors.is_empty() {
        return Err(RepeatError::Config(format!(
            "{}: no anchor points recorded",
            path.display()
        )));
    }
    Ok(anchors)
}

/// Location of the reference cloud for anchor `name`.
pub fn cloud_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, CLOUD_EXTENSION))
}

/// Load an `x y` point cloud file.
pub fn load_point_cloud(path: &Path) -> Result<PointCloud2D> {
    let records = read_records(path, 2)?;
    let mut cloud = PointCloud2D::with_capacity(records.len());
    for record in records {
        cloud.push_xy(record.f32(0)?, record.f32(1)?);
    }
    Ok(cloud)
}

/// One non-comment line, split into fields.
struct Record<'a> {
    path: &'a Path,
    line: usize,
    fields: Vec<String>,
}

impl Record<'_> {
    fn error(&self, message: String) -> RepeatError {
        RepeatError::Config(format!(
            "{}:{}: {}",
            self.path.display(),
            self.line,
            message
        ))
    }

    fn f64(&self, index: usize) -> Result<f64> {
        let field = &self.fields[index];
        match field.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.error(format!("invalid number '{}'", field))),
        }
    }

    fn f32(&self, index: usize) -> Result<f32> {
        self.f64(index).map(|v| v as f32)
    }
}

fn read_records(path: &Path, field_count: usize) -> Result<Vec<Record<'_>>> {
    let file = File::open(path).map_err(|e| {
        RepeatError::Config(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record = Record {
            path,
            line: index + 1,
            fields: trimmed.split_whitespace().map(str::to_string).collect(),
        };
        if record.fields.len() != field_count {
            return Err(record.error(format!(
                "expected {} fields, found {}",
                field_count,
                record.fields.len()
            )));
        }
        records.push(record);
    }
    Ok(records)
}

/// Recorded sequences must be non-empty and sorted by time.
fn check_sequence<T>(path: &Path, items: &[Timestamped<T>]) -> Result<()> {
    if items.is_empty() {
        return Err(RepeatError::Config(format!(
            "{}: no records",
            path.display()
        )));
    }
    if let Some(i) = items
        .windows(2)
        .position(|w| w[1].timestamp_us < w[0].timestamp_us)
    {
        return Err(RepeatError::Config(format!(
            "{}: timestamps go backwards at record {}",
            path.display(),
            i + 2
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn teach_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "speeds.sl",
            "# t linear angular\n0.0 0.2 0.0\n1.0 0.2 0.1\n\n2.0 0.0 0.0\n",
        );
        write(
            dir.path(),
            "positions.pl",
            "0.0 0.0 0.0 0.0\n1.0 0.2 0.0 0.0\n2.0 0.4 0.0 0.1\n",
        );
        write(dir.path(), "anchorPoints.apd", "A 0.0 0.0 0.0\nB 0.4 0.0 0.1\n");
        write(dir.path(), "A.cloud", "1.0 0.0\n1.0 0.5\n");
        write(dir.path(), "B.cloud", "0.6 -0.2\n");
        dir
    }

    fn config(dir: &TempDir) -> TeachConfig {
        TeachConfig {
            directory: dir.path().to_path_buf(),
            ..TeachConfig::default()
        }
    }

    #[test]
    fn test_load_recording() {
        let dir = teach_dir();
        let recording = TeachRecording::load(&config(&dir)).unwrap();

        assert_eq!(recording.commands.len(), 3);
        assert_eq!(recording.commands[1].timestamp_us, 1_000_000);
        assert_eq!(recording.commands[1].data, Twist2D::new(0.2, 0.1));
        assert_eq!(recording.positions.len(), 3);
        assert_eq!(recording.positions[2].data.x, 0.4);
        assert_eq!(recording.anchors.len(), 2);
        assert_eq!(recording.anchors[0].name(), "A");
        assert_eq!(recording.anchors[0].cloud().len(), 2);
        assert_eq!(recording.anchors[1].cloud().len(), 1);
        assert_eq!(recording.duration_us(), 2_000_000);
    }

    #[test]
    fn test_missing_directory() {
        let config = TeachConfig {
            directory: PathBuf::from("/nonexistent/teach"),
            ..TeachConfig::default()
        };
        assert!(matches!(
            TeachRecording::load(&config),
            Err(RepeatError::Config(_))
        ));
    }

    #[test]
    fn test_parse_error_names_file_and_line() {
        let dir = teach_dir();
        write(dir.path(), "speeds.sl", "0.0 0.2 0.0\n1.0 fast 0.0\n");
        match TeachRecording::load(&config(&dir)) {
            Err(RepeatError::Config(message)) => {
                assert!(message.contains("speeds.sl:2"), "{}", message);
                assert!(message.contains("fast"), "{}", message);
            }
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_field_count() {
        let dir = teach_dir();
        write(dir.path(), "positions.pl", "0.0 0.0 0.0\n");
        assert!(matches!(
            TeachRecording::load(&config(&dir)),
            Err(RepeatError::Config(_))
        ));
    }

    #[test]
    fn test_empty_commands_rejected() {
        let dir = teach_dir();
        write(dir.path(), "speeds.sl", "# nothing recorded\n");
        assert!(matches!(
            TeachRecording::load(&config(&dir)),
            Err(RepeatError::Config(_))
        ));
    }

    #[test]
    fn test_backwards_timestamps_rejected() {
        let dir = teach_dir();
        write(dir.path(), "speeds.sl", "0.0 0.1 0.0\n2.0 0.1 0.0\n1.0 0.1 0.0\n");
        match TeachRecording::load(&config(&dir)) {
            Err(RepeatError::Config(message)) => assert!(message.contains("backwards")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_anchor_cloud() {
        let dir = teach_dir();
        fs::remove_file(dir.path().join("B.cloud")).unwrap();
        match TeachRecording::load(&config(&dir)) {
            Err(RepeatError::Config(message)) => assert!(message.contains("B.cloud")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_anchor_list_rejected() {
        let dir = teach_dir();
        write(dir.path(), "anchorPoints.apd", "\n");
        assert!(matches!(
            TeachRecording::load(&config(&dir)),
            Err(RepeatError::Config(_))
        ));
    }
}
