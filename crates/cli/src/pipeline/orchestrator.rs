//! Pipeline orchestrator - wires source, correlator and dispatcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{CameraFrame, DetectorBlueprint, LightClassifier, TrafficWaypoint};
use ingestion::IngestionPipeline;
use tl_detector::{build_classifier, Correlator, DetectorContext};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// How often the frame loop checks whether every source has finished
const SOURCE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the dispatcher gets to flush its sinks at shutdown
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The detector blueprint, with CLI overrides applied
    pub blueprint: DetectorBlueprint,

    /// Maximum number of frames to process (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Publication channel capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    ///
    /// Completes when the frame limit or timeout is reached, or when every
    /// drive source has finished (a replay without looping).
    #[instrument(name = "pipeline_run", skip(self))]
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            max_frames,
            timeout,
            buffer_size,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let context = Arc::new(DetectorContext::new());
        let stop_lines = blueprint.stop_lines();

        // Ingestion
        info!("Setting up ingestion pipeline...");
        let source = ingestion::build_source(&blueprint.source, &stop_lines)
            .map_err(|e| CliError::source_setup(e.to_string()))?;
        let source_id = source.source_id().to_string();
        let mut ingestion = IngestionPipeline::new(Arc::clone(&context));
        ingestion
            .register_source(source)
            .map_err(|e| CliError::source_setup(e.to_string()))?;

        info!(source = %source_id, "Ingestion pipeline configured");

        // Correlator
        let classifier = build_classifier(&blueprint.classifier, &context);
        let mut correlator = Correlator::new(
            Arc::clone(&context),
            stop_lines,
            blueprint.detector.debounce,
            classifier,
        );

        info!(
            stop_lines = correlator.resolver().stop_lines().len(),
            threshold = blueprint.detector.debounce.threshold,
            "Correlator configured"
        );

        // Dispatcher
        info!("Setting up dispatcher...");
        let (publication_tx, publication_rx) = mpsc::channel::<TrafficWaypoint>(buffer_size);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - publications will be discarded");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), publication_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = dispatcher.sink_count();
        let sink_metrics = dispatcher.metrics_handles();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Start
        info!("Starting drive data ingestion...");
        ingestion.start_all();
        let frames = ingestion
            .take_receiver()
            .ok_or_else(|| CliError::pipeline_execution("frame receiver already taken"))?;

        info!(max_frames = ?max_frames, "Detector running");

        let mut stats = PipelineStats {
            source_id,
            active_sinks,
            ..Default::default()
        };

        let processing = process_frames(
            &frames,
            &ingestion,
            &mut correlator,
            &publication_tx,
            max_frames,
            &mut stats,
        );

        match timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, processing).await.is_err() {
                    warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                    stats.timed_out = true;
                }
            }
            None => processing.await,
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        drop(publication_tx);

        match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not drain before the shutdown deadline"),
        }

        stats.correlator = correlator.stats();
        stats.stable_state = correlator.debounce().stable_color();
        stats.ingestion = ingestion.metrics().snapshot();
        stats.sinks = sink_metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Correlate frames until a stop condition, forwarding every publication
async fn process_frames<C: LightClassifier>(
    frames: &Receiver<CameraFrame>,
    ingestion: &IngestionPipeline,
    correlator: &mut Correlator<C>,
    publications: &mpsc::Sender<TrafficWaypoint>,
    max_frames: Option<u64>,
    stats: &mut PipelineStats,
) {
    let mut source_check = tokio::time::interval(SOURCE_POLL_INTERVAL);

    loop {
        let frame = tokio::select! {
            received = frames.recv() => match received {
                Ok(frame) => frame,
                Err(_) => {
                    info!("Frame channel closed");
                    break;
                }
            },
            _ = source_check.tick() => {
                if ingestion.all_finished() && frames.is_empty() {
                    info!("All drive sources finished");
                    break;
                }
                continue;
            }
        };

        let received_at = Instant::now();
        let publication = correlator.on_frame(&frame);
        stats.frames_processed += 1;

        let latency_ms = received_at.elapsed().as_secs_f64() * 1000.0;
        observability::record_publication(&publication);
        observability::record_publication_latency_ms(latency_ms);
        stats.publications.update(&publication);
        stats.publications.record_latency_ms(latency_ms);

        if publications.send(publication).await.is_err() {
            warn!("Dispatcher channel closed");
            break;
        }
        stats.publications_sent += 1;

        if let Some(max) = max_frames {
            if stats.frames_processed >= max {
                info!(frames = stats.frames_processed, "Reached max frames limit");
                break;
            }
        }
    }
}
