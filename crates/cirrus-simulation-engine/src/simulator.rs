//! Discrete-event simulation driver
//!
//! Single-threaded and step-driven: one iteration per time step admits
//! arrivals, drains the queue, completes executions, runs the per-step
//! scaling evaluations, and records a snapshot. The whole run is a pure
//! function of (configuration, seed); identical inputs produce identical
//! snapshots and query outcomes.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::events::EventGenerator;
use crate::metrics::{MetricsCollector, MetricsSummary};
use crate::queue::QueryQueue;
use crate::rng::RandomStream;
use crate::types::{ActiveExecution, CompletedQuery, Query, Snapshot};
use crate::warehouse::Warehouse;

const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Everything a run produces: the aggregate report, the snapshot time
/// series, and the per-query outcome records
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub summary: MetricsSummary,
    pub snapshots: Vec<Snapshot>,
    pub completed: Vec<CompletedQuery>,
}

/// The simulation driver
pub struct Simulator {
    config: SimulationConfig,
    warehouse: Warehouse,
    queue: QueryQueue,
    /// Typed association of in-flight queries to their executions, keyed
    /// by query id for deterministic iteration
    active: BTreeMap<u64, ActiveExecution>,
    metrics: MetricsCollector,

    // Cumulative billing
    compute_dbus: f64,
    inference_dbus: f64,
    cost: f64,
}

impl Simulator {
    /// Create a simulator from a configuration, validating it first
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let warehouse = Warehouse::new(config.warehouse.clone());
        Ok(Simulator {
            config,
            warehouse,
            queue: QueryQueue::new(),
            active: BTreeMap::new(),
            metrics: MetricsCollector::new(),
            compute_dbus: 0.0,
            inference_dbus: 0.0,
            cost: 0.0,
        })
    }

    /// Generate the workload from the configured seed and run to horizon
    pub fn run(self) -> Result<SimulationReport> {
        let generator = EventGenerator::new(&self.config)?;
        let mut stream = RandomStream::from_seed(self.config.seed);
        let workload = generator.generate(&mut stream);

        let scheduled = workload
            .iter()
            .filter(|q| q.kind == crate::types::QueryKind::Scheduled)
            .count();
        info!(
            days = self.config.days,
            size = %self.config.warehouse.size,
            dbus_per_hour = self.config.warehouse.dbus_per_hour(),
            seed = stream.seed(),
            "starting simulation"
        );
        info!(
            scheduled,
            interactive = workload.len() - scheduled,
            total = workload.len(),
            "generated workload"
        );

        self.run_with_workload(workload)
    }

    /// Run the step loop over an explicit workload. Exposed so tests and
    /// callers with pre-built arrival sequences can drive the loop
    /// directly.
    pub fn run_with_workload(mut self, mut workload: Vec<Query>) -> Result<SimulationReport> {
        workload.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));

        let horizon = self.config.total_seconds();
        let step = self.config.time_step_seconds;
        let num_steps = self.config.num_steps();

        let mut next_arrival = 0usize;
        let mut last_logged_day = 0u32;

        for i in 0..=num_steps {
            let now = (i as f64 * step).min(horizon);

            // 1. Admit arrivals in order
            while next_arrival < workload.len() && workload[next_arrival].arrival_time <= now {
                self.queue.push(workload[next_arrival].clone());
                next_arrival += 1;
            }

            // 2. Drain the queue, recording queuing delay per assignment
            for (query, cluster_id) in self.queue.drain(now, &mut self.warehouse) {
                self.metrics.record_wait(query.kind, now - query.arrival_time);
                let previous = self.active.insert(
                    query.id,
                    ActiveExecution {
                        query,
                        cluster_id,
                        started_at: now,
                    },
                );
                if let Some(existing) = previous {
                    return Err(SimError::invariant(format!(
                        "query {} assigned while already executing",
                        existing.query.id
                    )));
                }
            }

            // 3. Complete finished executions in query-id order
            let finished: Vec<u64> = self
                .active
                .iter()
                .filter(|(_, exec)| exec.ends_at() <= now)
                .map(|(id, _)| *id)
                .collect();
            for query_id in finished {
                let exec = self
                    .active
                    .remove(&query_id)
                    .expect("finished ids come from the active set");
                self.complete_execution(exec, now)?;
            }

            // 4. Per-step scaling: idle sweep plus at most one scale-down
            self.warehouse.step(now);

            // 5. Snapshot
            self.metrics.record_snapshot(Snapshot {
                time: now,
                clusters: self.warehouse.cluster_count(),
                active_queries: self.warehouse.active_queries(),
                queued_queries: self.queue.len(),
                utilization: self.warehouse.utilization(),
                cumulative_dbus: self.compute_dbus + self.inference_dbus,
                cumulative_cost: self.cost,
            });

            let day = (now / SECONDS_PER_DAY) as u32;
            if day > last_logged_day {
                last_logged_day = day;
                info!(day, of = self.config.days, "completed simulated day");
            }
        }

        let unassigned_at_end = self.queue.len();
        let running_at_end = self.active.len();
        if unassigned_at_end > 0 {
            info!(unassigned_at_end, "queries still queued at horizon end");
        }

        let summary = self
            .metrics
            .summarize(&self.config, running_at_end, unassigned_at_end);
        info!(
            completed = summary.completed_queries,
            total = summary.total_queries,
            total_cost = summary.total_cost,
            "simulation complete"
        );

        Ok(SimulationReport {
            summary,
            snapshots: self.metrics.snapshots().to_vec(),
            completed: self.metrics.completed().to_vec(),
        })
    }

    /// Release the cluster slot and bill the completed query: resource
    /// time is duration-hours times the per-cluster DBU rate, plus a fixed
    /// inference increment when flagged.
    fn complete_execution(&mut self, exec: ActiveExecution, now: f64) -> Result<()> {
        self.warehouse.complete(exec.cluster_id, now)?;

        let resource_time =
            exec.query.duration / SECONDS_PER_HOUR * self.config.warehouse.dbus_per_hour();
        self.compute_dbus += resource_time;
        self.cost += resource_time * self.config.pricing.dbu_rate;

        if exec.query.uses_inference {
            let call_dbus = self.config.interactive.inference_dbus_per_call;
            self.inference_dbus += call_dbus;
            self.cost += call_dbus * self.config.pricing.inference_dbu_rate;
        }

        self.metrics.record_completion(CompletedQuery {
            query_id: exec.query.id,
            kind: exec.query.kind,
            arrival_time: exec.query.arrival_time,
            assigned_time: exec.started_at,
            completed_time: now,
            wait_time: exec.started_at - exec.query.arrival_time,
            duration: exec.query.duration,
            cluster_id: exec.cluster_id,
            uses_inference: exec.query.uses_inference,
        });

        Ok(())
    }
}

/// Convenience entry point: validate, build, and run in one call
pub fn run_simulation(config: SimulationConfig) -> Result<SimulationReport> {
    Simulator::new(config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimulationConfig, WarehouseSize};
    use crate::types::QueryKind;

    fn base_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.days = 1;
        config.time_step_seconds = 10.0;
        config.warehouse.size = WarehouseSize::Medium;
        config.warehouse.min_clusters = 1;
        config
    }

    fn query(id: u64, arrival: f64, duration: f64) -> Query {
        Query::new(id, QueryKind::Interactive, arrival, duration)
    }

    #[test]
    fn test_single_query_lifecycle() {
        let simulator = Simulator::new(base_config()).unwrap();
        let report = simulator
            .run_with_workload(vec![query(0, 0.0, 30.0)])
            .unwrap();

        assert_eq!(report.summary.completed_queries, 1);
        assert_eq!(report.summary.unassigned_at_end, 0);
        assert_eq!(report.summary.running_at_end, 0);
        assert_eq!(report.summary.wait.max, 0.0);

        let record = &report.completed[0];
        assert_eq!(record.assigned_time, 0.0);
        // Completion lands on the first step at or past t = 30
        assert_eq!(record.completed_time, 30.0);
    }

    #[test]
    fn test_resource_time_contribution() {
        // One 30s query at 4 DBU/h contributes 4 * 30/3600 DBU-hours
        let mut config = base_config();
        config.warehouse.size = WarehouseSize::TwoXSmall;

        let simulator = Simulator::new(config).unwrap();
        let report = simulator
            .run_with_workload(vec![query(0, 0.0, 30.0)])
            .unwrap();

        let expected = 4.0 * 30.0 / 3600.0;
        assert!((report.summary.compute_dbus - expected).abs() < 1e-9);
        let last = report.snapshots.last().unwrap();
        assert!((last.cumulative_dbus - expected).abs() < 1e-9);
    }

    #[test]
    fn test_scale_up_on_first_check_after_saturation() {
        // Four simultaneous arrivals saturate the only cluster at t = 0,
        // inside the scale-up delay window. The next assignment attempt
        // after the delay is the first scale-up check that can fire.
        let mut config = base_config();
        config.warehouse.scale_up_threshold = 0.8;
        config.warehouse.scale_up_delay_seconds = 5.0;

        let mut workload: Vec<Query> = (0..4).map(|id| query(id, 0.0, 3_600.0)).collect();
        workload.push(query(4, 10.0, 3_600.0));

        let simulator = Simulator::new(config).unwrap();
        let report = simulator.run_with_workload(workload).unwrap();

        let at = |time: f64| {
            report
                .snapshots
                .iter()
                .find(|s| s.time == time)
                .expect("snapshot exists")
                .clusters
        };
        assert_eq!(at(0.0), 1, "no second cluster before the delay elapses");
        assert_eq!(at(10.0), 2, "scale-up fires on the first post-delay check");

        // The fifth query lands on the new cluster without queuing
        assert_eq!(report.summary.wait.max, 0.0);
    }

    #[test]
    fn test_queued_queries_wait_and_conserve() {
        // A single cluster capped at 4 slots with 6 long queries: two must
        // queue, and accounting must cover every arrival.
        let mut config = base_config();
        config.warehouse.max_clusters = 1;

        let workload: Vec<Query> = (0..6).map(|id| query(id, 0.0, 120.0)).collect();
        let simulator = Simulator::new(config).unwrap();
        let report = simulator.run_with_workload(workload).unwrap();

        assert_eq!(report.summary.completed_queries, 6);
        assert_eq!(report.summary.total_queries, 6);

        // First four run immediately. The first completions land at
        // t = 120, after that step's drain already ran, so the queued pair
        // is picked up on the next step's drain at t = 130.
        let mut waits: Vec<f64> = report.completed.iter().map(|r| r.wait_time).collect();
        waits.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(&waits[..4], &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(&waits[4..], &[130.0, 130.0]);
    }

    #[test]
    fn test_unassigned_at_horizon_reported() {
        // Queries that never fit are reported, not dropped
        let mut config = base_config();
        config.warehouse.max_clusters = 1;

        // Fill the cluster past the horizon, then more arrivals behind it
        let horizon = config.total_seconds();
        let mut workload: Vec<Query> = (0..4)
            .map(|id| query(id, 0.0, horizon * 2.0))
            .collect();
        workload.extend((4..7).map(|id| query(id, 100.0, 10.0)));

        let simulator = Simulator::new(config).unwrap();
        let report = simulator.run_with_workload(workload).unwrap();

        assert_eq!(report.summary.running_at_end, 4);
        assert_eq!(report.summary.unassigned_at_end, 3);
        assert_eq!(report.summary.completed_queries, 0);
        assert_eq!(report.summary.total_queries, 7);

        let last = report.snapshots.last().unwrap();
        assert_eq!(last.queued_queries, 3);
    }

    #[test]
    fn test_full_run_from_generated_workload() {
        let mut config = base_config();
        config.warehouse.min_clusters = 0;

        let report = run_simulation(config).unwrap();
        assert!(report.summary.total_queries > 0);
        assert!(report.summary.completed_queries > 0);
        assert!(report.summary.total_cost > 0.0);
        assert_eq!(report.snapshots.len(), 8_641);
    }
}
