//! Per-sink counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single sink
///
/// Written by the sink's writer task and by the dispatcher loop, read by the
/// orchestrator when it prints the run summary.
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    write_count: AtomicU64,
    failure_count: AtomicU64,
    /// Queued publications replaced by newer ones while the sink was behind
    superseded_count: AtomicU64,
    /// Frame id of the last publication written
    last_frame_id: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Record a successful write of `frame_id`
    pub fn record_write(&self, frame_id: u64) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.last_frame_id.store(frame_id, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn superseded_count(&self) -> u64 {
        self.superseded_count.load(Ordering::Relaxed)
    }

    pub fn inc_superseded_count(&self) {
        self.superseded_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            superseded_count: self.superseded_count(),
            last_frame_id: self.last_frame_id.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub superseded_count: u64,
    pub last_frame_id: u64,
}

impl MetricsSnapshot {
    /// Publications offered to the sink
    pub fn offered(&self) -> u64 {
        self.write_count + self.failure_count + self.superseded_count + self.queue_len as u64
    }
}
