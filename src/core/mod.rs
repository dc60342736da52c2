//! Core foundation layer.
//!
//! Bottom layer of the replay stack with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Poses, velocity commands, point clouds, timestamps
//! - [`math`]: Angle normalization and planar distance helpers

pub mod math;
pub mod types;
