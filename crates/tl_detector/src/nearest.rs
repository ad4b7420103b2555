//! Nearest-waypoint search.
//!
//! Linear scan over the route. This is the dominant per-frame cost; routes
//! of a few thousand waypoints stay well under a millisecond.

use contracts::{DetectorError, Point2, WaypointIndex, WaypointMap};

/// Index of the waypoint closest to `point`
///
/// Ties resolve to the smallest index.
///
/// # Errors
/// [`DetectorError::NoRouteLoaded`] when the route is empty.
pub fn nearest_waypoint(point: &Point2, map: &WaypointMap) -> Result<WaypointIndex, DetectorError> {
    let mut best: Option<(WaypointIndex, f64)> = None;

    for (index, waypoint) in map.iter().enumerate() {
        let dist = point.distance_squared(&waypoint.position);
        // strict comparison keeps the earliest index on ties
        if best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((index, dist));
        }
    }

    best.map(|(index, _)| index).ok_or(DetectorError::NoRouteLoaded)
}
