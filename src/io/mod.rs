//! Input/output for the replay engine.
//!
//! - [`teach`]: Loader for a recorded teach directory
//! - [`sink`]: Output sink trait and the built-in sinks
//! - [`console`]: Line-based operator console

pub mod console;
pub mod sink;
pub mod teach;

pub use sink::{AnchorSwitch, MemorySink, ReplaySink, TracingSink};
pub use teach::TeachRecording;
