//! Simulated drive source
//!
//! Drives a vehicle along the configured route at constant speed, cycles
//! every simulated light, and renders one solid-color camera frame per tick
//! showing the light nearest to the vehicle. Used for development and tests
//! without a simulator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    CameraFrame, DriveDataCallback, DriveEvent, DriveSource, ImageData, ImageFormat, LightColor,
    Point2, SimulatedLight, SimulationConfig, TrafficLightState, VehiclePose, WaypointMap,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};

const RED_LAMP: [u8; 3] = [230, 20, 20];
const YELLOW_LAMP: [u8; 3] = [250, 200, 10];
const GREEN_LAMP: [u8; 3] = [20, 220, 60];
const DARK: [u8; 3] = [40, 40, 40];

/// Pixel color a camera sees for a light
pub fn lamp_rgb(color: LightColor) -> [u8; 3] {
    match color {
        LightColor::Red => RED_LAMP,
        LightColor::Yellow => YELLOW_LAMP,
        LightColor::Green => GREEN_LAMP,
        LightColor::Unknown => DARK,
    }
}

/// Polyline with arc-length lookup
#[derive(Debug, Clone)]
struct Track {
    vertices: Vec<Point2>,
    /// Distance from the first vertex to each vertex
    cumulative: Vec<f64>,
    closed: bool,
}

impl Track {
    fn new(points: &[Point2], closed: bool) -> Self {
        let mut vertices = points.to_vec();
        if closed && points.len() > 1 {
            vertices.push(points[0]);
        }

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        for (i, vertex) in vertices.iter().enumerate() {
            if i > 0 {
                total += vertices[i - 1].distance(vertex);
            }
            cumulative.push(total);
        }

        Self {
            vertices,
            cumulative,
            closed,
        }
    }

    fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Position after travelling `s` meters from the first vertex
    fn position_at(&self, s: f64) -> Point2 {
        let length = self.length();
        if self.vertices.len() < 2 || length <= 0.0 {
            return self.vertices.first().copied().unwrap_or_default();
        }

        let s = if self.closed {
            s.rem_euclid(length)
        } else {
            s.clamp(0.0, length)
        };

        let segment = self
            .cumulative
            .partition_point(|&c| c <= s)
            .saturating_sub(1)
            .min(self.vertices.len() - 2);
        let start = self.cumulative[segment];
        let span = self.cumulative[segment + 1] - start;
        let t = if span > 0.0 { (s - start) / span } else { 0.0 };
        self.vertices[segment].lerp(&self.vertices[segment + 1], t)
    }
}

/// Deterministic world model behind [`MockDriveSource`]
///
/// All queries are pure functions of simulated time, so tests can sample the
/// world without running the source thread.
#[derive(Debug, Clone)]
pub struct DriveSimulation {
    config: SimulationConfig,
    route: WaypointMap,
    track: Track,
    lights: Vec<SimulatedLight>,
}

impl DriveSimulation {
    /// Build the world; `stop_lines` seed one light each when none are configured
    pub fn new(config: SimulationConfig, stop_lines: &[Point2]) -> Result<Self> {
        let points = config.route.points();
        if points.is_empty() {
            return Err(IngestionError::EmptyRoute);
        }

        let track = Track::new(&points, config.route.is_closed());
        let lights = if config.lights.is_empty() {
            stop_lines
                .iter()
                .map(|&position| SimulatedLight {
                    position,
                    cycle: Default::default(),
                    offset_s: 0.0,
                })
                .collect()
        } else {
            config.lights.clone()
        };

        Ok(Self {
            route: points.into_iter().collect(),
            track,
            lights,
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn route(&self) -> &WaypointMap {
        &self.route
    }

    pub fn pose_at(&self, t: f64) -> VehiclePose {
        VehiclePose {
            position: self.track.position_at(self.config.speed_mps * t),
            timestamp: t,
        }
    }

    pub fn lights_at(&self, t: f64) -> Vec<TrafficLightState> {
        self.lights
            .iter()
            .map(|light| TrafficLightState {
                position: light.position,
                color: light.cycle.color_at(t + light.offset_s),
            })
            .collect()
    }

    /// Color of the nearest light within camera range, UNKNOWN if none
    pub fn visible_color_at(&self, t: f64) -> LightColor {
        let vehicle = self.pose_at(t).position;
        let range_sq = self.config.visibility_m * self.config.visibility_m;
        self.lights_at(t)
            .into_iter()
            .map(|light| (vehicle.distance_squared(&light.position), light.color))
            .filter(|(d, _)| *d <= range_sq)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(LightColor::Unknown, |(_, color)| color)
    }

    /// Render the camera frame at time `t`, possibly corrupted by noise
    pub fn frame_at(&self, frame_id: u64, t: f64, rng: &mut impl Rng) -> CameraFrame {
        let mut color = self.visible_color_at(t);
        if self.config.noise_rate > 0.0 && rng.random_bool(self.config.noise_rate) {
            let others: Vec<LightColor> = LightColor::ALL
                .into_iter()
                .filter(|c| *c != color)
                .collect();
            color = others[rng.random_range(0..others.len())];
        }

        CameraFrame {
            frame_id,
            timestamp: t,
            image: ImageData::solid(
                self.config.frame_width,
                self.config.frame_height,
                ImageFormat::Bgra8,
                lamp_rgb(color),
            ),
        }
    }
}

/// Mock drive source
///
/// Implements [`DriveSource`]; a background thread emits poses at `pose_hz`
/// and, at `camera_hz`, ground-truth lights followed by a camera frame. The
/// route is published before the first frame unless `route_delay_frames`
/// holds it back.
pub struct MockDriveSource {
    source_id: String,
    simulation: DriveSimulation,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MockDriveSource {
    pub fn new(
        source_id: impl Into<String>,
        config: SimulationConfig,
        stop_lines: &[Point2],
    ) -> Result<Self> {
        Ok(Self::from_simulation(
            source_id,
            DriveSimulation::new(config, stop_lines)?,
        ))
    }

    pub fn from_simulation(source_id: impl Into<String>, simulation: DriveSimulation) -> Self {
        Self {
            source_id: source_id.into(),
            simulation,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub fn simulation(&self) -> &DriveSimulation {
        &self.simulation
    }
}

impl DriveSource for MockDriveSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: DriveDataCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let simulation = self.simulation.clone();
        let listening = self.listening.clone();

        debug!(source_id = %source_id, "mock drive source started");

        let handle = thread::spawn(move || {
            run_simulation(&simulation, &listening, &callback);
            debug!(source_id = %source_id, "mock drive source stopped");
        });
        *self.thread_handle.lock() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for MockDriveSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_simulation(simulation: &DriveSimulation, listening: &AtomicBool, callback: &DriveDataCallback) {
    let config = simulation.config();
    let pose_dt = 1.0 / config.pose_hz;
    let frame_dt = 1.0 / config.camera_hz;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let started = Instant::now();
    let (mut next_pose, mut next_frame) = (0.0_f64, 0.0_f64);
    let mut frame_id = 0u64;
    let mut route_sent = false;

    while listening.load(Ordering::Relaxed) {
        let t = next_pose.min(next_frame);
        let due = Duration::from_secs_f64(t / config.time_scale);
        if let Some(wait) = due.checked_sub(started.elapsed()) {
            thread::sleep(wait);
        }
        if !listening.load(Ordering::Relaxed) {
            break;
        }

        if next_pose <= t {
            callback(DriveEvent::Pose(simulation.pose_at(t)));
            next_pose += pose_dt;
        }

        if next_frame <= t {
            if !route_sent && frame_id >= u64::from(config.route_delay_frames) {
                callback(DriveEvent::Route(simulation.route().clone()));
                route_sent = true;
            }
            callback(DriveEvent::TrafficLights(simulation.lights_at(t)));

            frame_id += 1;
            trace!(frame_id, t, "mock frame");
            callback(DriveEvent::Frame(simulation.frame_at(frame_id, t, &mut rng)));
            next_frame += frame_dt;
        }
    }
}
