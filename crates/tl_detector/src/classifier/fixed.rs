//! Scripted classifier for tests and dry runs.

use contracts::{CameraFrame, DetectorError, LightClassifier, LightColor, StopLine};

/// Returns a fixed, repeating sequence of colors
///
/// The sequence advances once per classified frame. An empty sequence always
/// yields UNKNOWN.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    sequence: Vec<LightColor>,
    cursor: usize,
}

impl FixedClassifier {
    pub fn new(sequence: Vec<LightColor>) -> Self {
        Self {
            sequence,
            cursor: 0,
        }
    }

    /// Number of frames classified so far
    pub fn calls(&self) -> usize {
        self.cursor
    }
}

impl LightClassifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn classify(
        &mut self,
        frame: Option<&CameraFrame>,
        _target: &StopLine,
    ) -> Result<LightColor, DetectorError> {
        frame.ok_or(DetectorError::NoImageAvailable)?;

        let color = if self.sequence.is_empty() {
            LightColor::Unknown
        } else {
            self.sequence[self.cursor % self.sequence.len()]
        };
        self.cursor += 1;
        Ok(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ImageData, ImageFormat, Point2};

    fn target() -> StopLine {
        StopLine {
            ordinal: 0,
            position: Point2::new(0.0, 0.0),
        }
    }

    #[test]
    fn test_sequence_repeats() {
        let frame = CameraFrame {
            frame_id: 0,
            timestamp: 0.0,
            image: ImageData::solid(1, 1, ImageFormat::Rgb8, [0, 0, 0]),
        };
        let mut classifier = FixedClassifier::new(vec![LightColor::Red, LightColor::Green]);
        let colors: Vec<_> = (0..4)
            .map(|_| classifier.classify(Some(&frame), &target()).unwrap())
            .collect();
        assert_eq!(
            colors,
            [LightColor::Red, LightColor::Green, LightColor::Red, LightColor::Green]
        );
        assert_eq!(classifier.calls(), 4);
    }

    #[test]
    fn test_no_frame() {
        let mut classifier = FixedClassifier::new(vec![LightColor::Red]);
        assert_eq!(
            classifier.classify(None, &target()),
            Err(DetectorError::NoImageAvailable)
        );
        assert_eq!(classifier.calls(), 0);
    }
}
