//! # Ingestion Pipeline
//!
//! Drive data ingestion module.
//!
//! Responsibilities:
//! - Provide drive sources (simulated and replayed)
//! - Apply pose, route and ground-truth light updates to the shared context
//! - Hand camera frames to the correlator through a latest-value channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockDriveSource};
//!
//! let context = Arc::new(DetectorContext::new());
//! let mut pipeline = IngestionPipeline::new(context.clone());
//! pipeline.register_source(Box::new(MockDriveSource::new("sim", sim_config, &stop_lines)?))?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(frame) = rx.recv().await {
//!     let publication = correlator.on_frame(&frame);
//! }
//! ```

mod config;
mod error;
mod mock;
mod pipeline;
mod replay;

pub use config::{IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use mock::{lamp_rgb, DriveSimulation, MockDriveSource};
pub use pipeline::IngestionPipeline;
pub use replay::{DriveRecord, ReplayDriveSource};

use contracts::{DriveSource, SourceConfig, StopLine};

/// Build the drive source described by the blueprint
pub fn build_source(config: &SourceConfig, stop_lines: &[StopLine]) -> Result<Box<dyn DriveSource>> {
    match config {
        SourceConfig::Mock(simulation) => {
            let positions: Vec<_> = stop_lines.iter().map(|s| s.position).collect();
            Ok(Box::new(MockDriveSource::new(
                "mock",
                simulation.clone(),
                &positions,
            )?))
        }
        SourceConfig::Replay(replay) => {
            Ok(Box::new(ReplayDriveSource::load("replay", replay.clone())?))
        }
    }
}
