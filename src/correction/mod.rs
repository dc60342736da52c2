//! Closed-loop correction layer.
//!
//! Turns live sensor readings into control errors by aligning them against
//! the reference cloud of the current anchor point.
//!
//! - [`service`]: Alignment service interface
//! - [`report`]: Control error and the reports sent back to the replay loop
//! - [`transforms`]: Startup lookup of the sensor-to-robot transform
//! - [`pipeline`]: At-most-one-in-flight correction loop

pub mod pipeline;
pub mod report;
pub mod service;
pub mod transforms;

pub use pipeline::{Admission, CorrectionLoop};
pub use report::{ControlError, CorrectionReport};
pub use service::{AlignmentRequest, AlignmentService, OfflineAlignment};
pub use transforms::{FrameTransformSource, StaticFrameTransforms, resolve_sensor_transform};
