//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the traffic-light
//! detector. Business crates depend on this crate only; reverse dependencies
//! are prohibited.
//!
//! ## Index Model
//! - Waypoints are identified by their position in the route (`usize`)
//! - On the wire "no waypoint" is `-1`, internally it is `None`
//!
//! ## Time Model
//! - Timestamps are simulation seconds (`f64`), used for diagnostics only
//! - `frame_id` orders camera frames and publications

mod blueprint;
mod classifier;
mod debounce_config;
mod drive_source;
mod error;
mod frame;
mod geometry;
mod light;
mod sink;

pub use blueprint::*;
pub use classifier::{LightClassifier, StopLine};
pub use debounce_config::DebounceConfig;
pub use drive_source::{DriveDataCallback, DriveEvent, DriveSource};
pub use error::*;
pub use frame::*;
pub use geometry::*;
pub use light::*;
pub use sink::*;
