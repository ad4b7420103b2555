//! # Dispatcher
//!
//! Publication fan-out module.
//!
//! Responsibilities:
//! - Consume `TrafficWaypoint` publications
//! - Fan-out to multiple sinks
//! - Isolate slow sinks so the correlator never blocks, keeping the newest
//!   publication when a sink falls behind

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{PublicationSink, TrafficWaypoint};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::{Offer, SinkHandle};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileFormat, FileSink, LogSink, NetworkFormat, NetworkSink};
