//! Motion corrector seam.
//!
//! The replay loop passes every recorded command through a
//! [`MotionCorrector`] before publishing it. Control errors from successful
//! alignments and runtime parameter updates are forwarded to the same
//! corrector. The control law itself lives outside this crate.

use crate::config::RuntimeParams;
use crate::core::types::Twist2D;
use crate::correction::ControlError;

/// Turns recorded commands into corrected commands.
///
/// Owned and driven by the replay thread only.
pub trait MotionCorrector: Send {
    /// Correct a recorded command using the most recent control error.
    fn correct_command(&mut self, recorded: Twist2D) -> Twist2D;

    /// Latest control error measured at an anchor point.
    fn update_error(&mut self, error: ControlError);

    /// Runtime parameters changed.
    fn update_params(&mut self, params: &RuntimeParams);
}

/// Corrector that replays commands unchanged.
#[derive(Debug, Default, Clone)]
pub struct PassThroughCorrector {
    last_error: Option<ControlError>,
    params: RuntimeParams,
}

impl PassThroughCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent control error, if any arrived.
    pub fn last_error(&self) -> Option<ControlError> {
        self.last_error
    }

    /// Parameters last forwarded.
    pub fn params(&self) -> &RuntimeParams {
        &self.params
    }
}

impl MotionCorrector for PassThroughCorrector {
    fn correct_command(&mut self, recorded: Twist2D) -> Twist2D {
        recorded
    }

    fn update_error(&mut self, error: ControlError) {
        self.last_error = Some(error);
    }

    fn update_params(&mut self, params: &RuntimeParams) {
        self.params = params.clone();
    }
}
