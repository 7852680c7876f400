//! Core types shared across the simulation engine

use serde::{Deserialize, Serialize};

/// Kind of query workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Periodic dashboard refresh
    Scheduled,
    /// Ad-hoc interactive query
    Interactive,
}

/// A single query, immutable once generated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: u64,
    pub kind: QueryKind,
    /// Arrival time in seconds from simulation start
    pub arrival_time: f64,
    /// Execution duration in seconds, already adjusted for warehouse performance
    pub duration: f64,
    /// Whether completion bills an auxiliary inference call
    pub uses_inference: bool,
}

impl Query {
    pub fn new(id: u64, kind: QueryKind, arrival_time: f64, duration: f64) -> Self {
        Query {
            id,
            kind,
            arrival_time,
            duration,
            uses_inference: false,
        }
    }
}

/// Association of a query to the cluster executing it
#[derive(Debug, Clone)]
pub struct ActiveExecution {
    pub query: Query,
    pub cluster_id: u64,
    pub started_at: f64,
}

impl ActiveExecution {
    /// Completion deadline for this execution
    pub fn ends_at(&self) -> f64 {
        self.started_at + self.query.duration
    }
}

/// Outcome record for a query that finished executing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedQuery {
    pub query_id: u64,
    pub kind: QueryKind,
    pub arrival_time: f64,
    pub assigned_time: f64,
    pub completed_time: f64,
    /// Queuing delay from arrival to assignment
    pub wait_time: f64,
    pub duration: f64,
    pub cluster_id: u64,
    pub uses_inference: bool,
}

/// Per-step warehouse observation, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time in seconds
    pub time: f64,
    pub clusters: usize,
    pub active_queries: u32,
    pub queued_queries: usize,
    /// In-flight queries over total provisioned capacity, 0 with no clusters
    pub utilization: f64,
    /// Cumulative billed DBU-hours (compute plus inference)
    pub cumulative_dbus: f64,
    /// Cumulative cost in dollars
    pub cumulative_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_deadline() {
        let query = Query::new(7, QueryKind::Interactive, 12.0, 30.0);
        let exec = ActiveExecution {
            query,
            cluster_id: 0,
            started_at: 20.0,
        };

        assert_eq!(exec.ends_at(), 50.0);
    }
}
