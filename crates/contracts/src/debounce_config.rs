//! Debounce configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Debounce engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DebounceConfig {
    /// Consecutive identical observations required before a color is trusted
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1))]
    pub threshold: u32,

    /// Below threshold, publish the raw candidate instead of the last stable
    /// decision
    #[serde(default = "default_always_publish_candidate")]
    pub always_publish_candidate: bool,

    /// Publish waypoint `-1` when the promoted color is neither RED nor YELLOW
    #[serde(default)]
    pub clear_waypoint_when_go: bool,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            always_publish_candidate: default_always_publish_candidate(),
            clear_waypoint_when_go: false,
        }
    }
}

fn default_threshold() -> u32 {
    3
}

fn default_always_publish_candidate() -> bool {
    true
}
