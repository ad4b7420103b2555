//! PublicationSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for publication sinks.

use crate::{ContractError, TrafficWaypoint};

/// Publication output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(PublicationSink: Send)]
pub trait LocalPublicationSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one publication
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, publication: &TrafficWaypoint) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
