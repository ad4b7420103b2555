//! DriveSource trait - drive data source abstraction
//!
//! A drive source delivers everything the detector consumes from the outside
//! world: vehicle pose, the route, ground-truth light states and camera frames.
//! Simulated and replayed sources share this interface.

use std::sync::Arc;

use crate::{CameraFrame, TrafficLightState, VehiclePose, WaypointMap};

/// One update from a drive source
#[derive(Debug, Clone)]
pub enum DriveEvent {
    /// Latest vehicle pose (overwrites the previous one)
    Pose(VehiclePose),

    /// Route waypoints (expected once, replacing is legal)
    Route(WaypointMap),

    /// Ground-truth state of every known light (simulation only)
    TrafficLights(Vec<TrafficLightState>),

    /// Camera frame; each one drives a correlation pass
    Frame(CameraFrame),
}

impl DriveEvent {
    /// Short label (used for logging/metrics)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pose(_) => "pose",
            Self::Route(_) => "route",
            Self::TrafficLights(_) => "traffic_lights",
            Self::Frame(_) => "frame",
        }
    }
}

/// Drive data callback type
///
/// Uses `Arc` so the callback can be shared with the source's worker thread.
pub type DriveDataCallback = Arc<dyn Fn(DriveEvent) + Send + Sync>;

/// Drive data source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn DriveSource> = build_source(&blueprint.source)?;
/// source.listen(Arc::new(|event| {
///     println!("received {}", event.kind());
/// }));
/// // ... use source ...
/// source.stop();
/// ```
pub trait DriveSource: Send + Sync {
    /// Source identifier
    fn source_id(&self) -> &str;

    /// Register data callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: DriveDataCallback);

    /// Stop producing events
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
