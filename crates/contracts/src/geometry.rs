//! Route geometry: points, waypoints, the waypoint map and the vehicle pose.

use serde::{Deserialize, Serialize};

/// Position of a waypoint in route order
pub type WaypointIndex = usize;

/// 2D map position (meters)
///
/// Serialized as a `[x, y]` pair so configuration files can list positions
/// compactly (`stop_line_positions = [[1148.56, 1184.65], ...]`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance; ordering-equivalent to `distance`
    #[inline]
    pub fn distance_squared(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Point2) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation, `t = 0` yields `self`
    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// Single route waypoint
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Waypoint {
    pub position: Point2,
}

impl Waypoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
        }
    }
}

impl From<Point2> for Waypoint {
    fn from(position: Point2) -> Self {
        Self { position }
    }
}

/// Ordered route waypoints
///
/// Order is route order and is semantically meaningful: indices are assumed
/// to increase along the direction of travel. The map is immutable once built;
/// replacing a route means swapping in a whole new map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointMap {
    waypoints: Vec<Waypoint>,
}

impl WaypointMap {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: WaypointIndex) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }
}

impl FromIterator<Point2> for WaypointMap {
    fn from_iter<I: IntoIterator<Item = Point2>>(iter: I) -> Self {
        Self {
            waypoints: iter.into_iter().map(Waypoint::from).collect(),
        }
    }
}

/// Latest known vehicle pose
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehiclePose {
    /// Map position
    pub position: Point2,

    /// Source timestamp (seconds)
    #[serde(default)]
    pub timestamp: f64,
}

impl VehiclePose {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            timestamp: 0.0,
        }
    }
}
