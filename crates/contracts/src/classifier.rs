//! LightClassifier trait - classification port
//!
//! Turns a camera frame into a raw color label for a target light.

use crate::{CameraFrame, DetectorError, LightColor, Point2};

/// Stop line selected as the classification target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLine {
    /// Position of this stop line in the configured list
    pub ordinal: usize,

    /// Stop-line position in map space
    pub position: Point2,
}

/// Raw color classifier
///
/// Implementations may be arbitrarily slow; the correlator waits for the
/// result, which throttles the effective frame rate.
pub trait LightClassifier: Send {
    /// Classifier name (used for logging)
    fn name(&self) -> &str;

    /// Classify the light guarding `target`
    ///
    /// # Errors
    /// Returns [`DetectorError::NoImageAvailable`] when `frame` is `None`.
    /// The caller treats that as an UNKNOWN observation.
    fn classify(
        &mut self,
        frame: Option<&CameraFrame>,
        target: &StopLine,
    ) -> Result<LightColor, DetectorError>;
}

impl<T: LightClassifier + ?Sized> LightClassifier for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn classify(
        &mut self,
        frame: Option<&CameraFrame>,
        target: &StopLine,
    ) -> Result<LightColor, DetectorError> {
        (**self).classify(frame, target)
    }
}
