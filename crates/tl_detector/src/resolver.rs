//! Upcoming stop-line resolution.
//!
//! "Ahead" is an index test: a stop line is upcoming when its nearest
//! waypoint index is `>=` the vehicle's. Indices are assumed to increase in
//! the direction of travel; closed routes are not unwrapped at the seam.

use std::sync::Arc;

use contracts::{DetectorError, StopLine, WaypointIndex, WaypointMap};

use crate::nearest::nearest_waypoint;

/// Stop line selected for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpcomingStopLine {
    /// Route waypoint nearest to the stop line
    pub waypoint: WaypointIndex,

    /// The winning stop line
    pub stop_line: StopLine,
}

/// Resolve the closest upcoming stop line along the route
///
/// Returns `Ok(None)` when every stop line is behind the vehicle. Stop lines
/// mapping to the same waypoint resolve to the earliest configured one.
///
/// # Errors
/// [`DetectorError::NoRouteLoaded`] when the route is empty.
pub fn resolve_upcoming(
    vehicle_waypoint: WaypointIndex,
    stop_lines: &[StopLine],
    map: &WaypointMap,
) -> Result<Option<UpcomingStopLine>, DetectorError> {
    let waypoints = stop_line_waypoints(stop_lines, map)?;
    Ok(select_upcoming(vehicle_waypoint, stop_lines, &waypoints))
}

fn stop_line_waypoints(
    stop_lines: &[StopLine],
    map: &WaypointMap,
) -> Result<Vec<WaypointIndex>, DetectorError> {
    if map.is_empty() {
        return Err(DetectorError::NoRouteLoaded);
    }
    stop_lines
        .iter()
        .map(|line| nearest_waypoint(&line.position, map))
        .collect()
}

fn select_upcoming(
    vehicle_waypoint: WaypointIndex,
    stop_lines: &[StopLine],
    waypoints: &[WaypointIndex],
) -> Option<UpcomingStopLine> {
    stop_lines
        .iter()
        .zip(waypoints)
        .filter(|(_, &waypoint)| waypoint >= vehicle_waypoint)
        // min_by_key keeps the first minimum, i.e. configuration order
        .min_by_key(|(_, &waypoint)| waypoint)
        .map(|(&stop_line, &waypoint)| UpcomingStopLine {
            waypoint,
            stop_line,
        })
}

/// Stop-line resolver with a per-route cache
///
/// Stop lines are static and a route is immutable once loaded, so the
/// stop-line to waypoint mapping is computed once per route and reused until
/// a different route snapshot is seen.
#[derive(Debug)]
pub struct StopLineResolver {
    stop_lines: Vec<StopLine>,
    cache: Option<RouteCache>,
}

#[derive(Debug)]
struct RouteCache {
    route: Arc<WaypointMap>,
    waypoints: Vec<WaypointIndex>,
}

impl StopLineResolver {
    pub fn new(stop_lines: Vec<StopLine>) -> Self {
        Self {
            stop_lines,
            cache: None,
        }
    }

    pub fn stop_lines(&self) -> &[StopLine] {
        &self.stop_lines
    }

    /// Cached waypoint for each configured stop line, if a route was seen
    pub fn stop_line_waypoints(&self) -> Option<&[WaypointIndex]> {
        self.cache.as_ref().map(|cache| cache.waypoints.as_slice())
    }

    /// Resolve against `route`, refreshing the cache on route change
    ///
    /// # Errors
    /// [`DetectorError::NoRouteLoaded`] when the route is empty.
    pub fn resolve(
        &mut self,
        vehicle_waypoint: WaypointIndex,
        route: &Arc<WaypointMap>,
    ) -> Result<Option<UpcomingStopLine>, DetectorError> {
        let stale = self
            .cache
            .as_ref()
            .map_or(true, |cache| !Arc::ptr_eq(&cache.route, route));

        if stale {
            let waypoints = stop_line_waypoints(&self.stop_lines, route)?;
            tracing::debug!(
                route_len = route.len(),
                stop_lines = self.stop_lines.len(),
                waypoints = ?waypoints,
                "stop lines mapped onto route"
            );
            self.cache = Some(RouteCache {
                route: Arc::clone(route),
                waypoints,
            });
        }

        let waypoints = self
            .cache
            .as_ref()
            .map(|cache| cache.waypoints.as_slice())
            .unwrap_or_default();

        Ok(select_upcoming(vehicle_waypoint, &self.stop_lines, waypoints))
    }
}
