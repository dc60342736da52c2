//! Core data types for trajectory replay.
//!
//! - [`Point2D`]: 2D point in meters
//! - [`Pose2D`]: Robot pose (x, y, theta) in meters and radians
//! - [`Twist2D`]: Velocity command (linear, angular)
//! - [`PointCloud2D`]: Sensor reading or reference cloud in Cartesian coordinates
//! - [`Timestamped<T>`]: Generic timestamp wrapper

mod cloud;
mod pose;
mod timestamped;
mod twist;

pub use cloud::PointCloud2D;
pub use pose::{Point2D, Pose2D};
pub use timestamped::{Timestamped, secs_to_us};
pub use twist::Twist2D;
