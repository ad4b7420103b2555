//! Built-in light classifiers.

mod fixed;
mod ground_truth;
mod pixel;

use std::sync::Arc;

pub use fixed::FixedClassifier;
pub use ground_truth::GroundTruthClassifier;
pub use pixel::PixelRatioClassifier;

use contracts::{ClassifierConfig, ClassifierKind, LightClassifier};

use crate::context::DetectorContext;

/// Create a classifier from configuration
///
/// The ground-truth classifier reads light states from `context`.
pub fn build_classifier(
    config: &ClassifierConfig,
    context: &Arc<DetectorContext>,
) -> Box<dyn LightClassifier> {
    let classifier: Box<dyn LightClassifier> = match config.kind {
        ClassifierKind::PixelRatio => Box::new(PixelRatioClassifier::new(config.threshold)),
        ClassifierKind::GroundTruth => Box::new(GroundTruthClassifier::new(Arc::clone(context))),
        ClassifierKind::Fixed => Box::new(FixedClassifier::new(config.sequence.clone())),
    };
    tracing::info!(classifier = classifier.name(), "classifier created");
    classifier
}
