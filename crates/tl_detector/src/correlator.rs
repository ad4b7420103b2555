//! Per-frame correlation pass.

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    CameraFrame, DebounceConfig, DetectorError, LightClassifier, LightColor, Observation,
    StopLine, TrafficWaypoint,
};
use tracing::instrument;

use crate::context::{ContextSnapshot, DetectorContext};
use crate::debounce::DebounceEngine;
use crate::nearest::nearest_waypoint;
use crate::resolver::StopLineResolver;

/// Per-run correlator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    /// Frames processed (every frame yields one publication)
    pub frames: u64,
    /// Shortcut: no pose received yet
    pub no_pose: u64,
    /// Shortcut: no route received yet
    pub no_route: u64,
    /// Shortcut: every stop line behind the vehicle
    pub no_upcoming: u64,
    /// Classifier had no image (fed to debounce as UNKNOWN)
    pub no_image: u64,
    /// Frames that went through the debounce engine
    pub debounced_frames: u64,
    /// Transitions into a new stable color
    pub promotions: u64,
}

impl CorrelatorStats {
    /// Frames answered with the `(-1, UNKNOWN)` shortcut
    pub fn guarded(&self) -> u64 {
        self.no_pose + self.no_route + self.no_upcoming
    }

    fn record_guard(&mut self, guard: DetectorError) {
        match guard {
            DetectorError::NoPoseYet => self.no_pose += 1,
            DetectorError::NoRouteLoaded => self.no_route += 1,
            DetectorError::NoUpcomingStopLine { .. } => self.no_upcoming += 1,
            DetectorError::NoImageAvailable => self.no_image += 1,
        }
    }
}

/// Correlator
///
/// Owns the debounce state and the classifier. Call [`Correlator::on_frame`]
/// once per camera frame; each call runs to completion and returns exactly
/// one publication.
pub struct Correlator<C> {
    context: Arc<DetectorContext>,
    resolver: StopLineResolver,
    classifier: C,
    debounce: DebounceEngine,
    stats: CorrelatorStats,
}

impl<C: LightClassifier> Correlator<C> {
    pub fn new(
        context: Arc<DetectorContext>,
        stop_lines: Vec<StopLine>,
        debounce: DebounceConfig,
        classifier: C,
    ) -> Self {
        Self {
            context,
            resolver: StopLineResolver::new(stop_lines),
            classifier,
            debounce: DebounceEngine::new(debounce),
            stats: CorrelatorStats::default(),
        }
    }

    /// Process one camera frame
    pub fn on_frame(&mut self, frame: &CameraFrame) -> TrafficWaypoint {
        self.process(frame.frame_id, frame.timestamp, Some(frame))
    }

    /// Process one pass, with or without an image
    ///
    /// A missing image reaches the classifier, which reports
    /// `NoImageAvailable`; that is observed as UNKNOWN.
    #[instrument(
        level = "trace",
        name = "correlator_process",
        skip_all,
        fields(frame_id = frame_id)
    )]
    pub fn process(
        &mut self,
        frame_id: u64,
        timestamp: f64,
        frame: Option<&CameraFrame>,
    ) -> TrafficWaypoint {
        let started = Instant::now();
        self.stats.frames += 1;

        let snapshot = self.context.snapshot();
        let publication = match self.observe(&snapshot, frame) {
            Ok(observation) => {
                let output = self.debounce.observe(observation);
                self.stats.debounced_frames += 1;
                if output.promoted {
                    self.stats.promotions += 1;
                    metrics::counter!(
                        "tl_detector_promotions_total",
                        "state" => output.color.as_str()
                    )
                    .increment(1);
                }
                output.into_publication(frame_id, timestamp)
            }
            Err(guard) => {
                self.stats.record_guard(guard);
                tracing::trace!(frame_id, reason = guard.reason(), "no signal ahead");
                metrics::counter!("tl_detector_guard_total", "reason" => guard.reason())
                    .increment(1);
                TrafficWaypoint::none(frame_id, timestamp)
            }
        };

        metrics::counter!("tl_detector_frames_total").increment(1);
        metrics::histogram!("tl_detector_frame_latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        tracing::debug!(
            frame_id,
            state = %publication.state,
            waypoint = publication.waypoint,
            debounced = publication.debounced,
            "frame correlated"
        );

        publication
    }

    /// Build the raw observation, or the guard that short-circuits it
    fn observe(
        &mut self,
        snapshot: &ContextSnapshot,
        frame: Option<&CameraFrame>,
    ) -> Result<Observation, DetectorError> {
        let pose = snapshot.pose.ok_or(DetectorError::NoPoseYet)?;
        let route = snapshot.route.as_ref().ok_or(DetectorError::NoRouteLoaded)?;

        let vehicle_waypoint = nearest_waypoint(&pose.position, route)?;
        let upcoming = self
            .resolver
            .resolve(vehicle_waypoint, route)?
            .ok_or(DetectorError::NoUpcomingStopLine { vehicle_waypoint })?;

        let color = match self.classifier.classify(frame, &upcoming.stop_line) {
            Ok(color) => color,
            Err(err) => {
                self.stats.record_guard(err);
                tracing::trace!(
                    classifier = self.classifier.name(),
                    error = %err,
                    "classification unavailable, observing UNKNOWN"
                );
                LightColor::Unknown
            }
        };

        Ok(Observation::new(upcoming.waypoint, color))
    }

    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    pub fn debounce(&self) -> &DebounceEngine {
        &self.debounce
    }

    pub fn resolver(&self) -> &StopLineResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn context(&self) -> &Arc<DetectorContext> {
        &self.context
    }
}
