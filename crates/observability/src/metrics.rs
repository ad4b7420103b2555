//! Publication metrics
//!
//! Prometheus-facing `record_*` helpers plus an in-memory aggregator used
//! for the end-of-run summary.

use std::collections::BTreeMap;

use contracts::{LightColor, TrafficWaypoint};
use metrics::{counter, gauge, histogram};

/// Record one published traffic waypoint
pub fn record_publication(publication: &TrafficWaypoint) {
    counter!(
        "tl_detector_publications_total",
        "state" => publication.state.as_str()
    )
    .increment(1);

    if publication.debounced {
        counter!("tl_detector_debounced_publications_total").increment(1);
    }

    gauge!("tl_detector_last_frame_id").set(publication.frame_id as f64);
    gauge!("tl_detector_published_state").set(f64::from(publication.state.code()));
    gauge!("tl_detector_published_waypoint").set(publication.waypoint as f64);
}

/// Record the time from frame receipt to publication
pub fn record_publication_latency_ms(latency_ms: f64) {
    histogram!("tl_detector_publication_latency_ms").record(latency_ms);
}

/// In-memory aggregate of every publication of a run
#[derive(Debug, Clone, Default)]
pub struct PublicationAggregator {
    pub total: u64,
    pub debounced: u64,
    /// Publications carrying the `-1` waypoint
    pub without_waypoint: u64,
    /// Changes of the published `(state, waypoint)` pair
    pub changes: u64,
    pub by_state: BTreeMap<&'static str, u64>,
    pub latency_stats: RunningStats,
    last: Option<(LightColor, i64)>,
}

impl PublicationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, publication: &TrafficWaypoint) {
        self.total += 1;
        if publication.debounced {
            self.debounced += 1;
        }
        if publication.waypoint_index().is_none() {
            self.without_waypoint += 1;
        }
        *self.by_state.entry(publication.state.as_str()).or_insert(0) += 1;

        let current = (publication.state, publication.waypoint);
        if self.last.is_some_and(|last| last != current) {
            self.changes += 1;
        }
        self.last = Some(current);
    }

    pub fn record_latency_ms(&mut self, latency_ms: f64) {
        self.latency_stats.push(latency_ms);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total: self.total,
            debounced: self.debounced,
            without_waypoint: self.without_waypoint,
            changes: self.changes,
            debounced_rate: percent(self.debounced, self.total),
            by_state: self.by_state.clone(),
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total: u64,
    pub debounced: u64,
    pub without_waypoint: u64,
    pub changes: u64,
    pub debounced_rate: f64,
    pub by_state: BTreeMap<&'static str, u64>,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publication Summary ===")?;
        writeln!(f, "Publications: {}", self.total)?;
        writeln!(
            f,
            "Debounced: {} ({:.2}%)",
            self.debounced, self.debounced_rate
        )?;
        writeln!(f, "Without waypoint: {}", self.without_waypoint)?;
        writeln!(f, "State changes: {}", self.changes)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.by_state.is_empty() {
            writeln!(f, "By state:")?;
            for (state, count) in &self.by_state {
                writeln!(f, "  {}: {}", state, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
