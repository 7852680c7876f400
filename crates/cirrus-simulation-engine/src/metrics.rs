//! Metrics accumulation and aggregation
//!
//! The collector ingests per-query wait times, completion records, and
//! per-step snapshots append-only during the run, then computes the
//! aggregate report on demand. Percentiles use nearest-rank on the sorted
//! sample array, not an interpolating estimator, so repeated runs report
//! identical values.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::types::{CompletedQuery, QueryKind, Snapshot};

const SECONDS_PER_HOUR: f64 = 3_600.0;
const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Nearest-rank percentile of a sorted sample array; 0 for empty input
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() as f64 * p).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Wait-time distribution statistics in seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitTimeStats {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl WaitTimeStats {
    fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return WaitTimeStats::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        WaitTimeStats {
            count: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
            max: *sorted.last().expect("samples checked non-empty"),
        }
    }
}

/// Aggregated results of a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    // Query accounting: every arrival ends in exactly one of the three
    // terminal states
    pub total_queries: usize,
    pub completed_queries: usize,
    pub running_at_end: usize,
    pub unassigned_at_end: usize,
    pub scheduled_queries: usize,
    pub interactive_queries: usize,
    pub inference_queries: usize,

    pub wait: WaitTimeStats,
    pub scheduled_wait: WaitTimeStats,
    pub interactive_wait: WaitTimeStats,

    pub avg_clusters: f64,
    pub peak_clusters: usize,
    pub avg_utilization: f64,
    pub max_queue_depth: usize,

    // Billed resource-time in DBU-hours
    pub compute_dbus: f64,
    pub inference_dbus: f64,
    pub total_dbus: f64,

    // Cost rollups in dollars
    pub compute_cost: f64,
    pub inference_cost: f64,
    pub total_cost: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
    pub annual_cost: f64,
}

/// Append-only accumulator for per-step and per-query outcomes
#[derive(Debug, Default)]
pub struct MetricsCollector {
    wait_times: Vec<f64>,
    scheduled_waits: Vec<f64>,
    interactive_waits: Vec<f64>,
    completed: Vec<CompletedQuery>,
    snapshots: Vec<Snapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        MetricsCollector::default()
    }

    /// Record the queuing delay of a newly assigned query
    pub fn record_wait(&mut self, kind: QueryKind, wait: f64) {
        self.wait_times.push(wait);
        match kind {
            QueryKind::Scheduled => self.scheduled_waits.push(wait),
            QueryKind::Interactive => self.interactive_waits.push(wait),
        }
    }

    pub fn record_completion(&mut self, record: CompletedQuery) {
        self.completed.push(record);
    }

    pub fn record_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn completed(&self) -> &[CompletedQuery] {
        &self.completed
    }

    /// Compute the aggregate report. The driver supplies the two
    /// non-terminal counts it observes at horizon end.
    pub fn summarize(
        &self,
        config: &SimulationConfig,
        running_at_end: usize,
        unassigned_at_end: usize,
    ) -> MetricsSummary {
        let dbus_per_hour = config.warehouse.dbus_per_hour();

        let mut compute_dbus = 0.0;
        let mut inference_dbus = 0.0;
        let mut inference_queries = 0;
        for record in &self.completed {
            compute_dbus += record.duration / SECONDS_PER_HOUR * dbus_per_hour;
            if record.uses_inference {
                inference_dbus += config.interactive.inference_dbus_per_call;
                inference_queries += 1;
            }
        }

        let compute_cost = compute_dbus * config.pricing.dbu_rate;
        let inference_cost = inference_dbus * config.pricing.inference_dbu_rate;
        let total_cost = compute_cost + inference_cost;
        let daily_cost = total_cost / config.days as f64;

        let (avg_clusters, peak_clusters, avg_utilization, max_queue_depth) =
            self.cluster_stats();

        MetricsSummary {
            total_queries: self.completed.len() + running_at_end + unassigned_at_end,
            completed_queries: self.completed.len(),
            running_at_end,
            unassigned_at_end,
            scheduled_queries: self.scheduled_waits.len(),
            interactive_queries: self.interactive_waits.len(),
            inference_queries,
            wait: WaitTimeStats::from_samples(&self.wait_times),
            scheduled_wait: WaitTimeStats::from_samples(&self.scheduled_waits),
            interactive_wait: WaitTimeStats::from_samples(&self.interactive_waits),
            avg_clusters,
            peak_clusters,
            avg_utilization,
            max_queue_depth,
            compute_dbus,
            inference_dbus,
            total_dbus: compute_dbus + inference_dbus,
            compute_cost,
            inference_cost,
            total_cost,
            daily_cost,
            monthly_cost: daily_cost * DAYS_PER_MONTH,
            annual_cost: daily_cost * DAYS_PER_YEAR,
        }
    }

    fn cluster_stats(&self) -> (f64, usize, f64, usize) {
        if self.snapshots.is_empty() {
            return (0.0, 0, 0.0, 0);
        }

        let avg_clusters = self.snapshots.iter().map(|s| s.clusters as f64).sum::<f64>()
            / self.snapshots.len() as f64;
        let peak_clusters = self.snapshots.iter().map(|s| s.clusters).max().unwrap_or(0);
        let max_queue_depth = self
            .snapshots
            .iter()
            .map(|s| s.queued_queries)
            .max()
            .unwrap_or(0);

        // Utilization is only meaningful while capacity exists
        let provisioned: Vec<f64> = self
            .snapshots
            .iter()
            .filter(|s| s.clusters > 0)
            .map(|s| s.utilization)
            .collect();
        let avg_utilization = if provisioned.is_empty() {
            0.0
        } else {
            provisioned.iter().sum::<f64>() / provisioned.len() as f64
        };

        (avg_clusters, peak_clusters, avg_utilization, max_queue_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimulationConfig, WarehouseSize};

    fn snapshot(time: f64, clusters: usize, active: u32, queued: usize) -> Snapshot {
        let utilization = if clusters == 0 {
            0.0
        } else {
            active as f64 / (clusters as f64 * 4.0)
        };
        Snapshot {
            time,
            clusters,
            active_queries: active,
            queued_queries: queued,
            utilization,
            cumulative_dbus: 0.0,
            cumulative_cost: 0.0,
        }
    }

    fn completion(query_id: u64, duration: f64, uses_inference: bool) -> CompletedQuery {
        CompletedQuery {
            query_id,
            kind: QueryKind::Interactive,
            arrival_time: 0.0,
            assigned_time: 0.0,
            completed_time: duration,
            wait_time: 0.0,
            duration,
            cluster_id: 0,
            uses_inference,
        }
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sorted: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&sorted, 0.50), 50.0);
        assert_eq!(percentile(&sorted, 0.95), 95.0);
        assert_eq!(percentile(&sorted, 0.99), 99.0);

        let small = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(percentile(&small, 0.50), 4.0);
        assert_eq!(percentile(&small, 0.99), 8.0);
        assert_eq!(percentile(&[], 0.50), 0.0);
    }

    #[test]
    fn test_wait_stats_from_samples() {
        let mut collector = MetricsCollector::new();
        for wait in [0.0, 10.0, 20.0, 30.0] {
            collector.record_wait(QueryKind::Interactive, wait);
        }
        collector.record_wait(QueryKind::Scheduled, 40.0);

        let summary = collector.summarize(&SimulationConfig::default(), 0, 0);
        assert_eq!(summary.wait.count, 5);
        assert_eq!(summary.wait.mean, 20.0);
        assert_eq!(summary.wait.max, 40.0);
        assert_eq!(summary.scheduled_wait.count, 1);
        assert_eq!(summary.interactive_wait.count, 4);
        assert_eq!(summary.interactive_wait.max, 30.0);
    }

    #[test]
    fn test_empty_collector_summary_is_zeroed() {
        let summary = collector_summary(&MetricsCollector::new());
        assert_eq!(summary.total_queries, 0);
        assert_eq!(summary.wait.count, 0);
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.avg_clusters, 0.0);
    }

    fn collector_summary(collector: &MetricsCollector) -> MetricsSummary {
        collector.summarize(&SimulationConfig::default(), 0, 0)
    }

    #[test]
    fn test_resource_time_billing() {
        // One 30s query on a 4 DBU/h warehouse bills 4 * 30/3600 DBU-hours
        let mut config = SimulationConfig::default();
        config.days = 1;
        config.warehouse.size = WarehouseSize::TwoXSmall;
        config.pricing.dbu_rate = 2.0;

        let mut collector = MetricsCollector::new();
        collector.record_completion(completion(0, 30.0, false));

        let summary = collector.summarize(&config, 0, 0);
        assert!((summary.compute_dbus - 4.0 * 30.0 / 3600.0).abs() < 1e-9);
        assert!((summary.total_cost - summary.compute_dbus * 2.0).abs() < 1e-9);
        assert_eq!(summary.inference_dbus, 0.0);
    }

    #[test]
    fn test_inference_billing_is_separate() {
        let mut config = SimulationConfig::default();
        config.days = 1;
        config.interactive.inference_dbus_per_call = 0.05;
        config.pricing.inference_dbu_rate = 0.70;

        let mut collector = MetricsCollector::new();
        collector.record_completion(completion(0, 10.0, true));
        collector.record_completion(completion(1, 10.0, false));

        let summary = collector.summarize(&config, 0, 0);
        assert_eq!(summary.inference_queries, 1);
        assert!((summary.inference_dbus - 0.05).abs() < 1e-12);
        assert!((summary.inference_cost - 0.05 * 0.70).abs() < 1e-12);
        assert!((summary.total_dbus - (summary.compute_dbus + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_cost_rollups() {
        let mut config = SimulationConfig::default();
        config.days = 2;
        config.warehouse.size = WarehouseSize::Medium;
        config.pricing.dbu_rate = 1.0;

        let mut collector = MetricsCollector::new();
        // 2 hours of execution at 24 DBU/h over two days
        collector.record_completion(completion(0, 3600.0, false));
        collector.record_completion(completion(1, 3600.0, false));

        let summary = collector.summarize(&config, 0, 0);
        assert!((summary.total_cost - 48.0).abs() < 1e-9);
        assert!((summary.daily_cost - 24.0).abs() < 1e-9);
        assert!((summary.monthly_cost - 720.0).abs() < 1e-9);
        assert!((summary.annual_cost - 8760.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_stats_over_snapshots() {
        let mut collector = MetricsCollector::new();
        collector.record_snapshot(snapshot(0.0, 0, 0, 0));
        collector.record_snapshot(snapshot(10.0, 1, 4, 2));
        collector.record_snapshot(snapshot(20.0, 2, 4, 5));
        collector.record_snapshot(snapshot(30.0, 1, 0, 0));

        let summary = collector_summary(&collector);
        assert_eq!(summary.peak_clusters, 2);
        assert_eq!(summary.max_queue_depth, 5);
        assert!((summary.avg_clusters - 1.0).abs() < 1e-9);
        // Mean over the three snapshots with capacity: (1.0 + 0.5 + 0.0) / 3
        assert!((summary.avg_utilization - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_conservation_accounting() {
        let mut collector = MetricsCollector::new();
        collector.record_completion(completion(0, 5.0, false));
        collector.record_completion(completion(1, 5.0, false));

        let summary = collector.summarize(&SimulationConfig::default(), 3, 4);
        assert_eq!(summary.completed_queries, 2);
        assert_eq!(summary.running_at_end, 3);
        assert_eq!(summary.unassigned_at_end, 4);
        assert_eq!(summary.total_queries, 9);
    }
}
