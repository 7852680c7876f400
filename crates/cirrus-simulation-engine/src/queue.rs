//! FIFO holding area for queries awaiting capacity

use std::collections::VecDeque;

use crate::types::Query;
use crate::warehouse::Warehouse;

/// Queries that could not be assigned on arrival, in arrival order
#[derive(Debug, Default)]
pub struct QueryQueue {
    queries: VecDeque<Query>,
}

impl QueryQueue {
    pub fn new() -> Self {
        QueryQueue {
            queries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn push(&mut self, query: Query) {
        self.queries.push_back(query);
    }

    /// Assign queued queries in arrival order, stopping at the first
    /// failure. Queries behind a blocked head wait even if a slot could
    /// take them; skip-scanning would change the reported wait-time
    /// distributions.
    pub fn drain(&mut self, now: f64, warehouse: &mut Warehouse) -> Vec<(Query, u64)> {
        let mut assigned = Vec::new();

        while !self.queries.is_empty() {
            match warehouse.assign(now) {
                Some(cluster_id) => {
                    let query = self.queries.pop_front().expect("queue checked non-empty");
                    assigned.push((query, cluster_id));
                }
                None => break,
            }
        }

        assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WarehouseConfig, WarehouseSize};
    use crate::types::{Query, QueryKind};

    fn single_cluster_warehouse() -> Warehouse {
        Warehouse::new(WarehouseConfig {
            size: WarehouseSize::Medium,
            min_clusters: 1,
            max_clusters: 1,
            ..WarehouseConfig::default()
        })
    }

    fn query(id: u64, arrival: f64) -> Query {
        Query::new(id, QueryKind::Interactive, arrival, 10.0)
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let mut warehouse = single_cluster_warehouse();
        let mut queue = QueryQueue::new();
        for id in 0..3 {
            queue.push(query(id, id as f64));
        }

        let assigned = queue.drain(5.0, &mut warehouse);
        let ids: Vec<u64> = assigned.iter().map(|(q, _)| q.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_stops_at_first_failure() {
        let mut warehouse = single_cluster_warehouse();
        // Leave one free slot on the only cluster
        for _ in 0..3 {
            warehouse.assign(0.0);
        }

        let mut queue = QueryQueue::new();
        for id in 0..3 {
            queue.push(query(id, 0.0));
        }

        let assigned = queue.drain(1.0, &mut warehouse);
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].0.id, 0);

        // The blocked head keeps everything behind it queued
        assert_eq!(queue.len(), 2);
        let assigned = queue.drain(2.0, &mut warehouse);
        assert!(assigned.is_empty());
        assert_eq!(queue.len(), 2);
    }
}
