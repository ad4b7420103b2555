//! Per-sink publication queue and writer task
//!
//! A sink that falls behind never blocks the correlator and never ends on a
//! stale decision: when its queue is full the oldest queued publication is
//! superseded by the newest one.

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{PublicationSink, TrafficWaypoint};

use crate::metrics::SinkMetrics;

/// Outcome of offering a publication to one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Queued behind earlier publications
    Queued,
    /// Queued, and the oldest waiting publication (`frame_id`) was discarded
    Superseded { frame_id: u64 },
    /// The writer task is gone
    Closed,
}

/// One sink behind its own latest-first queue
pub struct SinkHandle {
    name: String,
    queue: Sender<TrafficWaypoint>,
    metrics: Arc<SinkMetrics>,
    writer: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the writer task for `sink`
    pub fn spawn<S: PublicationSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (queue, pending) = async_channel::bounded(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let writer = tokio::spawn(write_publications(
            sink,
            pending,
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            queue,
            metrics,
            writer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a publication without waiting
    pub fn offer(&self, publication: TrafficWaypoint) -> Offer {
        let offer = match self.queue.force_send(publication) {
            Ok(None) => Offer::Queued,
            Ok(Some(stale)) => {
                self.metrics.inc_superseded_count();
                trace!(
                    sink = %self.name,
                    superseded = stale.frame_id,
                    frame_id = publication.frame_id,
                    "sink behind, oldest queued publication superseded"
                );
                Offer::Superseded {
                    frame_id: stale.frame_id,
                }
            }
            Err(_) => {
                error!(sink = %self.name, "sink writer closed unexpectedly");
                return Offer::Closed;
            }
        };
        self.metrics.set_queue_len(self.queue.len());
        offer
    }

    /// Write what is still queued, then flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        self.queue.close();
        if let Err(e) = self.writer.await {
            error!(sink = %self.name, error = ?e, "sink writer panicked");
        }
        debug!(sink = %self.name, "sink handle shut down");
    }
}

#[instrument(name = "sink_writer", skip(sink, pending, metrics), fields(sink = %name))]
async fn write_publications<S: PublicationSink>(
    mut sink: S,
    pending: Receiver<TrafficWaypoint>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("sink writer started");

    while let Ok(publication) = pending.recv().await {
        metrics.set_queue_len(pending.len());

        if let Err(e) = sink.write(&publication).await {
            metrics.inc_failure_count();
            error!(frame_id = publication.frame_id, error = %e, "publication write failed");
        } else {
            metrics.record_write(publication.frame_id);
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "close failed on shutdown");
    }

    debug!(written = metrics.write_count(), "sink writer stopped");
}
