//! # Traffic Light Detector
//!
//! Waypoint correlation and debounce engine.
//!
//! Per camera frame:
//! - nearest route waypoint to the vehicle
//! - nearest stop line at or ahead of that waypoint
//! - raw color from a [`LightClassifier`]
//! - temporal debounce into the published `TrafficWaypoint`
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tl_detector::{Correlator, DetectorContext, FixedClassifier};
//!
//! let context = Arc::new(DetectorContext::new());
//! let mut correlator = Correlator::new(
//!     context.clone(),
//!     blueprint.stop_lines(),
//!     blueprint.detector.debounce,
//!     FixedClassifier::new(vec![LightColor::Red]),
//! );
//!
//! context.set_route(route);
//! context.update_pose(pose);
//! let publication = correlator.on_frame(&frame);
//! ```

pub mod classifier;
mod context;
mod correlator;
mod debounce;
mod nearest;
mod resolver;

pub use classifier::{build_classifier, FixedClassifier, GroundTruthClassifier, PixelRatioClassifier};
pub use context::{ContextSnapshot, DetectorContext};
pub use correlator::{Correlator, CorrelatorStats};
pub use debounce::{DebounceEngine, DebounceOutput, DebouncePhase};
pub use nearest::nearest_waypoint;
pub use resolver::{resolve_upcoming, StopLineResolver, UpcomingStopLine};

// Re-export contracts types
pub use contracts::{
    DebounceConfig, DetectorError, LightClassifier, LightColor, Observation, StopLine,
    TrafficWaypoint,
};
