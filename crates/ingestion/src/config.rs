//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DriveEvent;

/// Ingestion metrics
///
/// Updated from source threads, read by the orchestrator for the summary.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    pub poses_received: AtomicU64,
    pub routes_received: AtomicU64,
    pub light_updates_received: AtomicU64,
    pub frames_received: AtomicU64,

    /// Frames overwritten before the correlator picked them up
    pub frames_dropped: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one incoming event by kind
    pub fn record_event(&self, event: &DriveEvent) {
        let counter = match event {
            DriveEvent::Pose(_) => &self.poses_received,
            DriveEvent::Route(_) => &self.routes_received,
            DriveEvent::TrafficLights(_) => &self.light_updates_received,
            DriveEvent::Frame(_) => &self.frames_received,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            poses_received: self.poses_received.load(Ordering::Relaxed),
            routes_received: self.routes_received.load(Ordering::Relaxed),
            light_updates_received: self.light_updates_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub poses_received: u64,
    pub routes_received: u64,
    pub light_updates_received: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::VehiclePose;

    #[test]
    fn test_record_by_kind() {
        let metrics = IngestionMetrics::new();
        metrics.record_event(&DriveEvent::Pose(VehiclePose::at(0.0, 0.0)));
        metrics.record_event(&DriveEvent::Pose(VehiclePose::at(1.0, 0.0)));
        metrics.record_event(&DriveEvent::TrafficLights(Vec::new()));
        metrics.record_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.poses_received, 2);
        assert_eq!(snapshot.light_updates_received, 1);
        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.frames_dropped, 1);
    }
}
