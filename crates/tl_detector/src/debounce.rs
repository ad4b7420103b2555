//! Temporal debounce of raw light observations.
//!
//! A color is trusted once it has been observed for `threshold` consecutive
//! frames. The run length counts the current frame, so promotion happens on
//! exactly the `threshold`-th identical observation.

use contracts::{DebounceConfig, LightColor, Observation, TrafficWaypoint, WaypointIndex};

/// Debounce state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    /// Candidate observed fewer than `threshold` times in a row
    Tracking {
        candidate: LightColor,
        run_length: u32,
    },
    /// Candidate confirmed; identical frames keep re-promoting it
    Stable { color: LightColor, run_length: u32 },
}

impl DebouncePhase {
    pub fn candidate(&self) -> LightColor {
        match *self {
            Self::Tracking { candidate, .. } => candidate,
            Self::Stable { color, .. } => color,
        }
    }

    pub fn run_length(&self) -> u32 {
        match *self {
            Self::Tracking { run_length, .. } | Self::Stable { run_length, .. } => run_length,
        }
    }
}

/// Result of one debounce transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOutput {
    /// Color to publish
    pub color: LightColor,

    /// Waypoint to publish (`None` is published as `-1`)
    pub waypoint: Option<WaypointIndex>,

    /// Whether `color` is a promoted (trusted) color
    pub debounced: bool,

    /// Whether this frame promoted a new stable color
    pub promoted: bool,
}

impl DebounceOutput {
    pub fn into_publication(self, frame_id: u64, timestamp: f64) -> TrafficWaypoint {
        TrafficWaypoint {
            frame_id,
            timestamp,
            state: self.color,
            waypoint: TrafficWaypoint::encode_waypoint(self.waypoint),
            debounced: self.debounced,
        }
    }
}

/// Debounce engine
///
/// One instance per process; mutated once per correlated frame and never
/// reset.
#[derive(Debug, Clone)]
pub struct DebounceEngine {
    config: DebounceConfig,
    phase: DebouncePhase,
    /// Last promoted color, `None` until the first promotion
    stable: Option<LightColor>,
    last_published_waypoint: Option<WaypointIndex>,
    promotions: u64,
}

impl DebounceEngine {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            phase: DebouncePhase::Tracking {
                candidate: LightColor::Unknown,
                run_length: 0,
            },
            stable: None,
            last_published_waypoint: None,
            promotions: 0,
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn phase(&self) -> DebouncePhase {
        self.phase
    }

    /// Last promoted color (UNKNOWN before the first promotion)
    pub fn stable_color(&self) -> LightColor {
        self.stable.unwrap_or_default()
    }

    pub fn last_published_waypoint(&self) -> Option<WaypointIndex> {
        self.last_published_waypoint
    }

    /// Number of transitions into a new stable color
    pub fn promotions(&self) -> u64 {
        self.promotions
    }

    /// Feed one raw observation; always yields exactly one output
    pub fn observe(&mut self, observation: Observation) -> DebounceOutput {
        let raw = observation.color;
        let run_length = if raw == self.phase.candidate() {
            self.phase.run_length().saturating_add(1)
        } else {
            1
        };

        if run_length >= self.config.threshold {
            self.promote(raw, run_length, observation.waypoint)
        } else {
            self.phase = DebouncePhase::Tracking {
                candidate: raw,
                run_length,
            };
            self.hold(observation)
        }
    }

    fn promote(
        &mut self,
        color: LightColor,
        run_length: u32,
        waypoint: Option<WaypointIndex>,
    ) -> DebounceOutput {
        let promoted = self.stable != Some(color);
        if promoted {
            self.promotions += 1;
            tracing::debug!(
                color = %color,
                previous = %self.stable_color(),
                waypoint = ?waypoint,
                "light state promoted"
            );
        }

        let waypoint = if self.config.clear_waypoint_when_go && !color.is_stop() {
            None
        } else {
            waypoint
        };

        self.phase = DebouncePhase::Stable { color, run_length };
        self.stable = Some(color);
        self.last_published_waypoint = waypoint;

        DebounceOutput {
            color,
            waypoint,
            debounced: true,
            promoted,
        }
    }

    fn hold(&self, observation: Observation) -> DebounceOutput {
        if self.config.always_publish_candidate {
            DebounceOutput {
                color: observation.color,
                waypoint: observation.waypoint,
                debounced: false,
                promoted: false,
            }
        } else {
            DebounceOutput {
                color: self.stable_color(),
                waypoint: self.last_published_waypoint,
                debounced: self.stable.is_some(),
                promoted: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use contracts::LightColor::{Green, Red, Unknown, Yellow};

    fn engine(threshold: u32) -> DebounceEngine {
        DebounceEngine::new(DebounceConfig {
            threshold,
            ..DebounceConfig::default()
        })
    }

    fn hold_stable(threshold: u32) -> DebounceEngine {
        DebounceEngine::new(DebounceConfig {
            threshold,
            always_publish_candidate: false,
            ..DebounceConfig::default()
        })
    }

    #[test]
    fn test_initial_state() {
        let engine = engine(3);
        assert_eq!(engine.stable_color(), Unknown);
        assert_eq!(engine.last_published_waypoint(), None);
        assert_eq!(
            engine.phase(),
            DebouncePhase::Tracking {
                candidate: Unknown,
                run_length: 0
            }
        );
    }

    #[test]
    fn test_promotes_on_threshold_frame() {
        let mut engine = engine(3);

        let out = engine.observe(Observation::new(2, Red));
        assert_eq!((out.color, out.waypoint, out.debounced), (Red, Some(2), false));
        assert_eq!(engine.stable_color(), Unknown);

        let out = engine.observe(Observation::new(2, Red));
        assert!(!out.debounced);
        assert_eq!(engine.stable_color(), Unknown);

        let out = engine.observe(Observation::new(2, Red));
        assert!(out.debounced && out.promoted);
        assert_eq!((out.color, out.waypoint), (Red, Some(2)));
        assert_eq!(engine.stable_color(), Red);
        assert_eq!(engine.last_published_waypoint(), Some(2));
    }

    #[test]
    fn test_red_red_red_green_sequence() {
        let mut engine = engine(3);
        for _ in 0..3 {
            engine.observe(Observation::new(2, Red));
        }

        let out = engine.observe(Observation::new(2, Green));
        // Candidate published below threshold, stable color unchanged
        assert_eq!((out.color, out.waypoint, out.debounced), (Green, Some(2), false));
        assert_eq!(engine.stable_color(), Red);
        assert_eq!(
            engine.phase(),
            DebouncePhase::Tracking {
                candidate: Green,
                run_length: 1
            }
        );

        engine.observe(Observation::new(2, Green));
        assert_eq!(engine.stable_color(), Red);
        let out = engine.observe(Observation::new(2, Green));
        assert!(out.promoted);
        assert_eq!(engine.stable_color(), Green);
    }

    #[test]
    fn test_interleaved_colors_never_promote() {
        let mut engine = engine(3);
        let pattern = [Red, Red, Green, Red, Red, Yellow, Red, Red, Unknown];
        for color in pattern {
            let out = engine.observe(Observation::new(5, color));
            assert!(!out.debounced, "promoted early on {color}");
        }
        assert_eq!(engine.stable_color(), Unknown);
        assert_eq!(engine.promotions(), 0);
    }

    #[test]
    fn test_constant_input_re_promotes() {
        let mut engine = engine(3);
        for _ in 0..3 {
            engine.observe(Observation::new(7, Yellow));
        }
        for _ in 0..10 {
            let out = engine.observe(Observation::new(7, Yellow));
            assert!(out.debounced);
            assert!(!out.promoted);
            assert_eq!(out.color, Yellow);
        }
        assert_eq!(engine.promotions(), 1);
        assert_eq!(engine.phase().run_length(), 13);
    }

    #[test]
    fn test_flicker_back_to_stable_color_is_not_a_promotion() {
        let mut engine = engine(3);
        for _ in 0..3 {
            engine.observe(Observation::new(2, Red));
        }
        engine.observe(Observation::new(2, Green));

        let mut outputs = Vec::new();
        for _ in 0..3 {
            outputs.push(engine.observe(Observation::new(2, Red)));
        }

        let last = outputs[2];
        assert!(last.debounced);
        assert!(!last.promoted);
        assert!(outputs.iter().all(|out| !out.promoted));
        assert_eq!(engine.stable_color(), Red);
        assert_eq!(engine.promotions(), 1);
    }

    #[test]
    fn test_stable_waypoint_follows_current_frame() {
        let mut engine = engine(2);
        engine.observe(Observation::new(10, Red));
        engine.observe(Observation::new(11, Red));
        assert_eq!(engine.last_published_waypoint(), Some(11));
        let out = engine.observe(Observation::new(12, Red));
        assert_eq!(out.waypoint, Some(12));
    }

    #[test]
    fn test_threshold_one_promotes_immediately() {
        let mut engine = engine(1);
        let out = engine.observe(Observation::new(0, Green));
        assert!(out.promoted);
        let out = engine.observe(Observation::new(0, Red));
        assert!(out.promoted);
        assert_eq!(engine.stable_color(), Red);
    }

    #[test]
    fn test_hold_stable_policy() {
        let mut engine = hold_stable(3);

        // Nothing promoted yet: report UNKNOWN with no waypoint
        let out = engine.observe(Observation::new(4, Red));
        assert_eq!((out.color, out.waypoint, out.debounced), (Unknown, None, false));

        engine.observe(Observation::new(4, Red));
        engine.observe(Observation::new(4, Red));
        assert_eq!(engine.stable_color(), Red);

        // Flicker to green keeps reporting the stable red decision
        let out = engine.observe(Observation::new(6, Green));
        assert_eq!((out.color, out.waypoint, out.debounced), (Red, Some(4), true));
    }

    #[test]
    fn test_clear_waypoint_when_go() {
        let mut engine = DebounceEngine::new(DebounceConfig {
            threshold: 1,
            clear_waypoint_when_go: true,
            ..DebounceConfig::default()
        });

        let out = engine.observe(Observation::new(9, Green));
        assert_eq!((out.color, out.waypoint), (Green, None));

        let out = engine.observe(Observation::new(9, Yellow));
        assert_eq!((out.color, out.waypoint), (Yellow, Some(9)));

        let out = engine.observe(Observation::new(9, Unknown));
        assert_eq!(out.waypoint, None);
        assert_eq!(engine.last_published_waypoint(), None);
    }

    #[test]
    fn test_into_publication() {
        let out = DebounceOutput {
            color: Red,
            waypoint: None,
            debounced: true,
            promoted: false,
        };
        let publication = out.into_publication(12, 0.6);
        assert_eq!(publication.wire(), (0, -1));
        assert_eq!(publication.frame_id, 12);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn color() -> impl Strategy<Value = LightColor> {
            prop::sample::select(LightColor::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn promotion_needs_threshold_consecutive_frames(
                threshold in 1u32..6,
                colors in prop::collection::vec(color(), 1..60),
            ) {
                let mut engine = engine(threshold);
                let mut run = 0u32;
                let mut previous: Option<LightColor> = None;

                for color in colors {
                    run = if previous == Some(color) { run + 1 } else { 1 };
                    previous = Some(color);

                    let out = engine.observe(Observation::new(1, color));
                    prop_assert_eq!(out.debounced, run >= threshold);
                    prop_assert_eq!(out.color, color);
                    if run >= threshold {
                        prop_assert_eq!(engine.stable_color(), color);
                    }
                }
            }
        }
    }
}
