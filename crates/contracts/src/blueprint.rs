//! DetectorBlueprint - Config Loader output
//!
//! Describes a complete detector deployment: stop lines, debounce policy,
//! classifier, drive source and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

use crate::{DebounceConfig, LightColor, Point2, StopLine};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete detector blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DetectorBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Correlation settings
    #[validate(nested)]
    pub detector: DetectorConfig,

    /// Color classifier selection
    #[serde(default)]
    #[validate(nested)]
    pub classifier: ClassifierConfig,

    /// Drive data source
    #[serde(default)]
    pub source: SourceConfig,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl DetectorBlueprint {
    /// Configured stop lines, in configuration order
    pub fn stop_lines(&self) -> Vec<StopLine> {
        self.detector.stop_lines()
    }
}

/// Correlation settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DetectorConfig {
    /// Stop-line positions in map space; order is the tie-break order
    #[validate(length(min = 1, message = "at least one stop line is required"))]
    pub stop_line_positions: Vec<Point2>,

    /// Debounce policy
    #[serde(default)]
    #[validate(nested)]
    pub debounce: DebounceConfig,
}

impl DetectorConfig {
    pub fn stop_lines(&self) -> Vec<StopLine> {
        self.stop_line_positions
            .iter()
            .enumerate()
            .map(|(ordinal, &position)| StopLine { ordinal, position })
            .collect()
    }
}

/// Classifier selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClassifierConfig {
    /// Classifier implementation
    #[serde(default)]
    pub kind: ClassifierKind,

    /// Minimum fraction of light-colored pixels (pixel_ratio only)
    #[serde(default = "default_pixel_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,

    /// Repeating label sequence (fixed only)
    #[serde(default)]
    pub sequence: Vec<LightColor>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            threshold: default_pixel_threshold(),
            sequence: Vec::new(),
        }
    }
}

fn default_pixel_threshold() -> f64 {
    0.3
}

/// Classifier implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Dominant-hue pixel counting on the camera image
    #[default]
    PixelRatio,
    /// Simulator ground truth for the target light
    GroundTruth,
    /// Scripted labels, for testing
    Fixed,
}

/// Drive data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Built-in simulated drive
    Mock(SimulationConfig),
    /// Recorded drive (JSON lines)
    Replay(ReplayConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Mock(SimulationConfig::default())
    }
}

/// Simulated drive
///
/// The vehicle moves along the route at constant speed while lights cycle
/// through green, yellow and red.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    /// Route geometry
    #[serde(default)]
    pub route: RouteSpec,

    /// Vehicle speed (m/s)
    #[serde(default = "default_speed")]
    #[validate(range(min = 0.0))]
    pub speed_mps: f64,

    /// Camera frame rate (Hz)
    #[serde(default = "default_camera_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub camera_hz: f64,

    /// Pose update rate (Hz)
    #[serde(default = "default_pose_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub pose_hz: f64,

    /// Wall-clock speedup, 1.0 is real time
    #[serde(default = "default_time_scale")]
    #[validate(range(exclusive_min = 0.0))]
    pub time_scale: f64,

    /// Camera frames emitted before the route is published
    #[serde(default)]
    pub route_delay_frames: u32,

    /// Simulated lights; empty means one light per stop line
    #[serde(default)]
    #[validate(nested)]
    pub lights: Vec<SimulatedLight>,

    /// Distance under which the nearest light is visible (m)
    #[serde(default = "default_visibility")]
    #[validate(range(exclusive_min = 0.0))]
    pub visibility_m: f64,

    /// Frame width in pixels
    #[serde(default = "default_frame_width")]
    #[validate(range(min = 1))]
    pub frame_width: u32,

    /// Frame height in pixels
    #[serde(default = "default_frame_height")]
    #[validate(range(min = 1))]
    pub frame_height: u32,

    /// Probability that a frame shows a wrong color
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_rate: f64,

    /// RNG seed for noise
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            route: RouteSpec::default(),
            speed_mps: default_speed(),
            camera_hz: default_camera_hz(),
            pose_hz: default_pose_hz(),
            time_scale: default_time_scale(),
            route_delay_frames: 0,
            lights: Vec::new(),
            visibility_m: default_visibility(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            noise_rate: 0.0,
            seed: default_seed(),
        }
    }
}

fn default_speed() -> f64 {
    10.0
}

fn default_camera_hz() -> f64 {
    10.0
}

fn default_pose_hz() -> f64 {
    50.0
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_visibility() -> f64 {
    80.0
}

fn default_frame_width() -> u32 {
    64
}

fn default_frame_height() -> u32 {
    48
}

fn default_seed() -> u64 {
    7
}

/// Route geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RouteSpec {
    /// Explicit waypoint list
    Points { points: Vec<Point2> },
    /// `count` evenly spaced waypoints from `start` to `end`
    Line {
        start: Point2,
        end: Point2,
        count: usize,
    },
    /// `count` waypoints on a counter-clockwise circle
    Loop {
        center: Point2,
        radius: f64,
        count: usize,
    },
}

impl Default for RouteSpec {
    fn default() -> Self {
        Self::Loop {
            center: Point2::new(0.0, 0.0),
            radius: 100.0,
            count: 200,
        }
    }
}

impl RouteSpec {
    /// Expand into route waypoints
    pub fn points(&self) -> Vec<Point2> {
        match self {
            Self::Points { points } => points.clone(),
            Self::Line { start, end, count } => match *count {
                0 => Vec::new(),
                1 => vec![*start],
                n => (0..n)
                    .map(|i| start.lerp(end, i as f64 / (n - 1) as f64))
                    .collect(),
            },
            Self::Loop {
                center,
                radius,
                count,
            } => (0..*count)
                .map(|i| {
                    let theta = std::f64::consts::TAU * i as f64 / *count as f64;
                    Point2::new(
                        center.x + radius * theta.cos(),
                        center.y + radius * theta.sin(),
                    )
                })
                .collect(),
        }
    }

    /// Whether the last waypoint connects back to the first
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Loop { .. })
    }
}

/// One simulated light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SimulatedLight {
    /// Light position
    pub position: Point2,

    /// Phase durations
    #[serde(default)]
    #[validate(nested)]
    pub cycle: LightCycle,

    /// Phase offset into the cycle (s)
    #[serde(default)]
    pub offset_s: f64,
}

/// Green, yellow, red phase durations (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct LightCycle {
    #[validate(range(min = 0.0))]
    pub green_s: f64,
    #[validate(range(min = 0.0))]
    pub yellow_s: f64,
    #[validate(range(min = 0.0))]
    pub red_s: f64,
}

impl Default for LightCycle {
    fn default() -> Self {
        Self {
            green_s: 8.0,
            yellow_s: 2.0,
            red_s: 6.0,
        }
    }
}

impl LightCycle {
    pub fn period(&self) -> f64 {
        self.green_s + self.yellow_s + self.red_s
    }

    /// Color at time `t` seconds into the cycle
    pub fn color_at(&self, t: f64) -> LightColor {
        let period = self.period();
        if period <= 0.0 || !t.is_finite() {
            return LightColor::Unknown;
        }
        let phase = t.rem_euclid(period);
        if phase < self.green_s {
            LightColor::Green
        } else if phase < self.green_s + self.yellow_s {
            LightColor::Yellow
        } else {
            LightColor::Red
        }
    }
}

/// Recorded drive replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// JSON lines file, one drive record per line
    pub path: PathBuf,

    /// Playback speed multiplier (0 = as fast as possible)
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    /// Restart from the beginning at end of file
    #[serde(default)]
    pub loop_playback: bool,
}

fn default_speed_multiplier() -> f64 {
    1.0
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output
    File,
    /// Network output (UDP)
    Network,
}
