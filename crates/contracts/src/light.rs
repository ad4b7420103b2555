//! Light colors, raw observations and the published traffic waypoint.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Point2, WaypointIndex};

/// Traffic light color
///
/// Wire codes follow the downstream planner's enumeration:
/// RED=0, YELLOW=1, GREEN=2, UNKNOWN=4 (3 is unused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
    #[default]
    Unknown,
}

impl LightColor {
    /// All colors, in wire-code order
    pub const ALL: [LightColor; 4] = [Self::Red, Self::Yellow, Self::Green, Self::Unknown];

    /// Integer code expected by the publication consumer
    pub const fn code(self) -> i32 {
        match self {
            Self::Red => 0,
            Self::Yellow => 1,
            Self::Green => 2,
            Self::Unknown => 4,
        }
    }

    /// Inverse of [`LightColor::code`]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Red),
            1 => Some(Self::Yellow),
            2 => Some(Self::Green),
            4 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Whether the color asks the vehicle to stop
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Red | Self::Yellow)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ground-truth state of one physical light (simulation only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightState {
    /// Light position in map space
    pub position: Point2,

    /// Current color
    pub color: LightColor,
}

/// Raw per-frame observation, input of the debounce engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Waypoint of the upcoming stop line, `None` when nothing is ahead
    pub waypoint: Option<WaypointIndex>,

    /// Raw classifier output
    pub color: LightColor,
}

impl Observation {
    pub fn new(waypoint: WaypointIndex, color: LightColor) -> Self {
        Self {
            waypoint: Some(waypoint),
            color,
        }
    }
}

/// Published decision: upcoming stop waypoint and its color
///
/// Emitted once per processed camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficWaypoint {
    /// Camera frame that produced this publication
    pub frame_id: u64,

    /// Camera frame timestamp (seconds)
    pub timestamp: f64,

    /// Light state, serialized as its integer code
    #[serde(with = "light_code")]
    pub state: LightColor,

    /// Stop-line waypoint index, `-1` when none
    pub waypoint: i64,

    /// Whether `state` is the debounced (promoted) color
    pub debounced: bool,
}

impl TrafficWaypoint {
    /// Sentinel waypoint value for "no signal ahead"
    pub const NO_WAYPOINT: i64 = -1;

    /// The `(-1, UNKNOWN)` publication
    pub fn none(frame_id: u64, timestamp: f64) -> Self {
        Self {
            frame_id,
            timestamp,
            state: LightColor::Unknown,
            waypoint: Self::NO_WAYPOINT,
            debounced: false,
        }
    }

    /// Waypoint as an index, `None` for the sentinel
    pub fn waypoint_index(&self) -> Option<WaypointIndex> {
        usize::try_from(self.waypoint).ok()
    }

    /// Encode an optional index using the `-1` sentinel
    pub fn encode_waypoint(index: Option<WaypointIndex>) -> i64 {
        index
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or(Self::NO_WAYPOINT)
    }

    /// `(state code, waypoint)` as delivered to the planner
    pub fn wire(&self) -> (i32, i64) {
        (self.state.code(), self.waypoint)
    }
}

mod light_code {
    use super::LightColor;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &LightColor, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(color.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LightColor, D::Error> {
        let code = i32::deserialize(deserializer)?;
        LightColor::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown light state code {code}")))
    }
}
