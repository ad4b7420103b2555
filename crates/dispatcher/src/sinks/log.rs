//! LogSink - logs publications via tracing

use contracts::{ContractError, LightColor, PublicationSink, TrafficWaypoint};
use tracing::{debug, info, instrument};

/// Sink that logs publications for debugging
///
/// Changes of the published `(state, waypoint)` pair are logged at info,
/// repeats at debug.
pub struct LogSink {
    name: String,
    last: Option<(LightColor, i64)>,
    written: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last: None,
            written: 0,
        }
    }

    fn log_publication(&mut self, publication: &TrafficWaypoint) {
        let current = (publication.state, publication.waypoint);
        if self.last != Some(current) {
            info!(
                sink = %self.name,
                frame_id = publication.frame_id,
                state = %publication.state,
                code = publication.state.code(),
                waypoint = publication.waypoint,
                debounced = publication.debounced,
                "traffic waypoint changed"
            );
            self.last = Some(current);
        } else {
            debug!(
                sink = %self.name,
                frame_id = publication.frame_id,
                debounced = publication.debounced,
                "traffic waypoint unchanged"
            );
        }
        self.written += 1;
    }
}

impl PublicationSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, publication),
        fields(sink = %self.name, frame_id = publication.frame_id)
    )]
    async fn write(&mut self, publication: &TrafficWaypoint) -> Result<(), ContractError> {
        self.log_publication(publication);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, publications = self.written, "LogSink closed");
        Ok(())
    }
}
