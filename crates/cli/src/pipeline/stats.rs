//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::LightColor;
use observability::PublicationAggregator;
use tl_detector::CorrelatorStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Camera frames correlated
    pub frames_processed: u64,

    /// Publications handed to the dispatcher
    pub publications_sent: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Whether the run ended on the timeout
    pub timed_out: bool,

    /// Drive source that fed the run
    pub source_id: String,

    /// Number of sinks receiving publications
    pub active_sinks: usize,

    /// Stable color when the run ended
    pub stable_state: LightColor,

    /// Correlator counters
    pub correlator: CorrelatorStats,

    /// Drive events received, and frames replaced before processing
    pub ingestion: ingestion::MetricsSnapshot,

    /// Publication aggregate
    pub publications: PublicationAggregator,

    /// Per-sink counters
    pub sinks: Vec<(String, dispatcher::MetricsSnapshot)>,
}

impl PipelineStats {
    /// Calculate frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received frames replaced before the correlator took them
    pub fn drop_rate(&self) -> f64 {
        let received = self.ingestion.frames_received;
        if received > 0 {
            (self.ingestion.frames_dropped as f64 / received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Detector Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!(
            "   ├─ Duration: {:.2}s{}",
            self.duration.as_secs_f64(),
            if self.timed_out { " (timed out)" } else { "" }
        );
        println!("   ├─ Source: {}", self.source_id);
        println!("   ├─ Frames processed: {}", self.frames_processed);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Publications sent: {}", self.publications_sent);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let ingestion = &self.ingestion;
        println!("\n📥 Ingestion");
        println!("   ├─ Poses: {}", ingestion.poses_received);
        println!("   ├─ Routes: {}", ingestion.routes_received);
        println!("   ├─ Light updates: {}", ingestion.light_updates_received);
        println!("   ├─ Frames received: {}", ingestion.frames_received);
        println!(
            "   └─ Frames replaced: {} ({:.2}%)",
            ingestion.frames_dropped,
            self.drop_rate()
        );

        let correlator = &self.correlator;
        println!("\n🚦 Correlator");
        println!("   ├─ Debounced frames: {}", correlator.debounced_frames);
        println!("   ├─ No pose yet: {}", correlator.no_pose);
        println!("   ├─ No route yet: {}", correlator.no_route);
        println!("   ├─ No stop line ahead: {}", correlator.no_upcoming);
        println!("   ├─ No image: {}", correlator.no_image);
        println!("   ├─ Promotions: {}", correlator.promotions);
        println!("   └─ Final stable state: {}", self.stable_state);

        println!("\n{}", self.publications.summary());

        if !self.sinks.is_empty() {
            println!("📤 Sinks");
            for (i, (name, sink)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: written {}, superseded {}, failed {}",
                    prefix, name, sink.write_count, sink.superseded_count, sink.failure_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut stats = PipelineStats {
            frames_processed: 50,
            duration: Duration::from_secs(5),
            ..Default::default()
        };
        stats.ingestion.frames_received = 80;
        stats.ingestion.frames_dropped = 20;

        assert_eq!(stats.fps(), 10.0);
        assert_eq!(stats.drop_rate(), 25.0);
    }

    #[test]
    fn test_empty_run_rates() {
        let stats = PipelineStats::default();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.drop_rate(), 0.0);
    }
}
