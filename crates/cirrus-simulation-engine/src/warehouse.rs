//! Warehouse cluster pool: autoscaling decisions and query placement
//!
//! Clusters are instantaneous-start, fixed-capacity slots. Scale-up is
//! evaluated on every assignment attempt; scale-down and idle shutdown are
//! evaluated once per simulation step by the driver. The idle timer is
//! derived from the last completion timestamp rather than stored as a
//! countdown, so it survives step-size changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::error::{Result, SimError};

/// A single ephemeral cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: u64,
    pub created_at: f64,
    pub active_queries: u32,
    /// None until the first completion; idle time before that is measured
    /// from creation
    pub last_query_end_time: Option<f64>,
    /// Set once removal is decided; a marked cluster accepts no new queries
    pub shutdown_at: Option<f64>,
}

impl Cluster {
    fn new(id: u64, created_at: f64) -> Self {
        Cluster {
            id,
            created_at,
            active_queries: 0,
            last_query_end_time: None,
            shutdown_at: None,
        }
    }

    /// Start of the current idle period
    pub fn idle_since(&self) -> f64 {
        self.last_query_end_time.unwrap_or(self.created_at)
    }

    pub fn is_accepting(&self) -> bool {
        self.shutdown_at.is_none()
    }
}

/// The cluster pool plus autoscaling policy state
pub struct Warehouse {
    config: WarehouseConfig,
    clusters: Vec<Cluster>,
    next_cluster_id: u64,
    last_scale_up_time: f64,
    last_scale_down_time: f64,
}

impl Warehouse {
    /// Create a warehouse starting at the configured minimum cluster count
    pub fn new(config: WarehouseConfig) -> Self {
        let mut warehouse = Warehouse {
            config,
            clusters: Vec::new(),
            next_cluster_id: 0,
            last_scale_up_time: 0.0,
            last_scale_down_time: 0.0,
        };
        for _ in 0..warehouse.config.min_clusters {
            warehouse.add_cluster(0.0);
        }
        warehouse
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Total in-flight queries across the pool
    pub fn active_queries(&self) -> u32 {
        self.clusters.iter().map(|c| c.active_queries).sum()
    }

    /// In-flight queries over total provisioned capacity, 0 with no
    /// clusters
    pub fn utilization(&self) -> f64 {
        if self.clusters.is_empty() {
            return 0.0;
        }
        let capacity = self.clusters.len() as u32 * self.config.effective_concurrency();
        self.active_queries() as f64 / capacity as f64
    }

    fn add_cluster(&mut self, now: f64) -> u64 {
        let id = self.next_cluster_id;
        self.next_cluster_id += 1;
        self.clusters.push(Cluster::new(id, now));
        id
    }

    /// Scale-up eligibility. An empty pool always scales up (auto-resume,
    /// not rate-limited); otherwise requires utilization at or above the
    /// threshold, the scale-up delay elapsed, and headroom under the max.
    fn should_scale_up(&self, now: f64) -> bool {
        if self.clusters.is_empty() {
            return true;
        }
        if self.clusters.len() >= self.config.max_clusters {
            return false;
        }
        if now - self.last_scale_up_time < self.config.scale_up_delay_seconds {
            return false;
        }
        self.utilization() >= self.config.scale_up_threshold
    }

    fn scale_up(&mut self, now: f64) {
        let id = self.add_cluster(now);
        self.last_scale_up_time = now;
        debug!(cluster_id = id, time = now, "scale-up: added cluster");
    }

    /// Attempt to place one query. Evaluates scale-up first, then picks the
    /// least-loaded accepting cluster with spare capacity, ties broken by
    /// lowest id. Returns the chosen cluster id, or None when the caller
    /// must queue the query.
    pub fn assign(&mut self, now: f64) -> Option<u64> {
        if self.should_scale_up(now) {
            self.scale_up(now);
        }

        let capacity = self.config.effective_concurrency();
        let candidate = self
            .clusters
            .iter_mut()
            .filter(|c| c.is_accepting() && c.active_queries < capacity)
            .min_by_key(|c| (c.active_queries, c.id))?;

        candidate.active_queries += 1;
        Some(candidate.id)
    }

    /// Release one query from a cluster. Completing against an unknown or
    /// zero-load cluster indicates a driver bug and aborts the run.
    pub fn complete(&mut self, cluster_id: u64, now: f64) -> Result<()> {
        let cluster = self
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster_id)
            .ok_or_else(|| {
                SimError::invariant(format!("completion against unknown cluster {cluster_id}"))
            })?;

        if cluster.active_queries == 0 {
            return Err(SimError::invariant(format!(
                "completion against idle cluster {cluster_id}"
            )));
        }

        cluster.active_queries -= 1;
        cluster.last_query_end_time = Some(now);
        Ok(())
    }

    /// Per-step scaling pass: physical removal sweep first, then at most
    /// one utilization-based scale-down mark.
    pub fn step(&mut self, now: f64) {
        self.sweep_idle(now);
        if self.should_scale_down(now) {
            self.scale_down(now);
        }
    }

    /// Remove clusters whose shutdown time has arrived and clusters idle
    /// past the timeout, holding the min_clusters floor. The idle path is
    /// the scale-to-zero path and is not rate-limited.
    fn sweep_idle(&mut self, now: f64) {
        let idle_timeout = self.config.idle_shutdown_seconds;
        let mut retained = Vec::with_capacity(self.clusters.len());
        let mut expired = Vec::new();

        for cluster in self.clusters.drain(..) {
            let shutdown_due = cluster.shutdown_at.is_some_and(|at| now >= at);
            let idle_expired =
                cluster.active_queries == 0 && now - cluster.idle_since() >= idle_timeout;
            if shutdown_due || idle_expired {
                expired.push(cluster);
            } else {
                retained.push(cluster);
            }
        }

        // Hold the floor with otherwise-expired clusters, reviving any
        // shutdown mark so they accept queries again.
        if retained.len() < self.config.min_clusters {
            let needed = self.config.min_clusters - retained.len();
            expired.sort_by_key(|c| (c.shutdown_at.is_some(), c.id));
            for mut cluster in expired.into_iter().take(needed) {
                cluster.shutdown_at = None;
                retained.push(cluster);
            }
        } else if !expired.is_empty() {
            debug!(
                removed = expired.len(),
                time = now,
                "idle sweep removed clusters"
            );
        }

        retained.sort_by_key(|c| c.id);
        self.clusters = retained;
    }

    fn should_scale_down(&self, now: f64) -> bool {
        if self.clusters.len() <= self.config.min_clusters {
            return false;
        }
        if now - self.last_scale_down_time < self.config.scale_down_delay_seconds {
            return false;
        }
        self.utilization() <= self.config.scale_down_threshold
    }

    /// Mark exactly one idle cluster for shutdown. If every cluster is
    /// busy, no removal happens this step.
    fn scale_down(&mut self, now: f64) {
        let candidate = self
            .clusters
            .iter_mut()
            .filter(|c| c.active_queries == 0 && c.is_accepting())
            .min_by_key(|c| c.id);

        if let Some(cluster) = candidate {
            cluster.shutdown_at = Some(now);
            self.last_scale_down_time = now;
            debug!(cluster_id = cluster.id, time = now, "scale-down: marked cluster");
        }
    }
}
