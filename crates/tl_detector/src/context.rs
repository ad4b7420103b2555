//! Latest-value state shared between drive sources and the correlator.

use std::sync::Arc;

use contracts::{CameraFrame, DriveEvent, TrafficLightState, VehiclePose, WaypointMap};
use parking_lot::RwLock;

/// Shared latest-value context
///
/// Sources overwrite pose, route and ground-truth lights from their own
/// threads; the correlator takes one [`ContextSnapshot`] per frame. There is
/// no history: every update replaces the previous value.
#[derive(Debug, Default)]
pub struct DetectorContext {
    state: RwLock<ContextState>,
}

#[derive(Debug, Default)]
struct ContextState {
    pose: Option<VehiclePose>,
    route: Option<Arc<WaypointMap>>,
    lights: Arc<Vec<TrafficLightState>>,
    pose_updates: u64,
    route_updates: u64,
}

/// Consistent view of the context for one correlation pass
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub pose: Option<VehiclePose>,
    pub route: Option<Arc<WaypointMap>>,
    pub lights: Arc<Vec<TrafficLightState>>,
}

impl DetectorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_pose(&self, pose: VehiclePose) {
        let mut state = self.state.write();
        state.pose = Some(pose);
        state.pose_updates += 1;
    }

    /// Replace the route; readers holding an older snapshot keep it alive
    pub fn set_route(&self, route: WaypointMap) {
        let len = route.len();
        {
            let mut state = self.state.write();
            state.route = Some(Arc::new(route));
            state.route_updates += 1;
        }
        tracing::info!(waypoints = len, "route loaded");
    }

    pub fn update_lights(&self, lights: Vec<TrafficLightState>) {
        self.state.write().lights = Arc::new(lights);
    }

    /// Apply a drive event; frames are handed back to the caller
    pub fn apply(&self, event: DriveEvent) -> Option<CameraFrame> {
        match event {
            DriveEvent::Pose(pose) => self.update_pose(pose),
            DriveEvent::Route(route) => self.set_route(route),
            DriveEvent::TrafficLights(lights) => self.update_lights(lights),
            DriveEvent::Frame(frame) => return Some(frame),
        }
        None
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read();
        ContextSnapshot {
            pose: state.pose,
            route: state.route.clone(),
            lights: Arc::clone(&state.lights),
        }
    }

    pub fn pose(&self) -> Option<VehiclePose> {
        self.state.read().pose
    }

    pub fn route(&self) -> Option<Arc<WaypointMap>> {
        self.state.read().route.clone()
    }

    /// Latest ground-truth light states
    pub fn lights(&self) -> Arc<Vec<TrafficLightState>> {
        Arc::clone(&self.state.read().lights)
    }

    /// `(pose updates, route updates)` received so far
    pub fn update_counts(&self) -> (u64, u64) {
        let state = self.state.read();
        (state.pose_updates, state.route_updates)
    }
}
