//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{CameraFrame, DriveDataCallback, DriveSource};
use tl_detector::DetectorContext;
use tracing::{debug, info, instrument, trace};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Frames buffered between sources and the correlator
///
/// One slot: a frame that is not picked up before the next arrives is
/// replaced, so the correlator always works on the newest image.
const FRAME_SLOTS: usize = 1;

/// Ingestion Pipeline
///
/// Fans every registered [`DriveSource`] into the shared
/// [`DetectorContext`]. Pose, route and light updates are applied in place on
/// the source thread; camera frames go to a single-slot channel consumed by
/// the correlator.
pub struct IngestionPipeline {
    sources: HashMap<String, Box<dyn DriveSource>>,
    context: Arc<DetectorContext>,
    metrics: Arc<IngestionMetrics>,
    tx: Sender<CameraFrame>,
    rx: Option<Receiver<CameraFrame>>,
}

impl IngestionPipeline {
    pub fn new(context: Arc<DetectorContext>) -> Self {
        let (tx, rx) = bounded(FRAME_SLOTS);

        Self {
            sources: HashMap::new(),
            context,
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
        }
    }

    /// Register a drive source under its own id
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(source_id = %source.source_id())
    )]
    pub fn register_source(&mut self, source: Box<dyn DriveSource>) -> Result<()> {
        let source_id = source.source_id().to_string();
        if self.sources.contains_key(&source_id) {
            return Err(IngestionError::DuplicateSource { source_id });
        }
        debug!(source_id = %source_id, "registered drive source");
        self.sources.insert(source_id, source);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting drive sources");
        for (source_id, source) in &self.sources {
            if !source.is_listening() {
                debug!(source_id = %source_id, "starting source");
                source.listen(self.callback(source_id));
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping drive sources");
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                debug!(source_id = %source_id, "stopping source");
                source.stop();
            }
        }
    }

    fn callback(&self, source_id: &str) -> DriveDataCallback {
        let source_id = source_id.to_string();
        let context = self.context.clone();
        let metrics = self.metrics.clone();
        let tx = self.tx.clone();

        Arc::new(move |event| {
            metrics.record_event(&event);
            let Some(frame) = context.apply(event) else {
                return;
            };

            match tx.force_send(frame) {
                Ok(None) => {}
                Ok(Some(stale)) => {
                    metrics.record_dropped();
                    metrics::counter!("tl_detector_frames_dropped_total").increment(1);
                    trace!(
                        source_id = %source_id,
                        frame_id = stale.frame_id,
                        "replaced unconsumed frame"
                    );
                }
                Err(_) => trace!(source_id = %source_id, "frame channel closed"),
            }
        })
    }

    /// Get the frame receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<CameraFrame>> {
        self.rx.take()
    }

    pub fn context(&self) -> &Arc<DetectorContext> {
        &self.context
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// True once every source has stopped on its own (e.g. replay finished)
    pub fn all_finished(&self) -> bool {
        self.sources.values().all(|s| !s.is_listening())
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
