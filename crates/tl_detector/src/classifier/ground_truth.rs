//! Simulator ground truth as a classifier.

use std::sync::Arc;

use contracts::{CameraFrame, DetectorError, LightClassifier, LightColor, StopLine};

use crate::context::DetectorContext;

/// Reports the ground-truth color of the light nearest to the target stop
/// line
///
/// Only meaningful in simulation, where a source publishes light states.
/// Returns UNKNOWN while no light state is known.
#[derive(Debug, Clone)]
pub struct GroundTruthClassifier {
    context: Arc<DetectorContext>,
}

impl GroundTruthClassifier {
    pub fn new(context: Arc<DetectorContext>) -> Self {
        Self { context }
    }
}

impl LightClassifier for GroundTruthClassifier {
    fn name(&self) -> &str {
        "ground_truth"
    }

    fn classify(
        &mut self,
        frame: Option<&CameraFrame>,
        target: &StopLine,
    ) -> Result<LightColor, DetectorError> {
        frame.ok_or(DetectorError::NoImageAvailable)?;

        let lights = self.context.lights();
        let nearest = lights.iter().min_by(|a, b| {
            let da = a.position.distance_squared(&target.position);
            let db = b.position.distance_squared(&target.position);
            da.total_cmp(&db)
        });

        Ok(nearest.map_or(LightColor::Unknown, |light| light.color))
    }
}
