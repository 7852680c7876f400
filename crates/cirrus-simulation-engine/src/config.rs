//! Simulation configuration: workload, warehouse policy, and pricing
//!
//! Every parameter has a default matching the reference deployment; a
//! configuration is validated once, before the run starts, and is
//! immutable afterwards.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Baseline warehouse throughput (Medium), the reference point for
/// performance and concurrency scaling
pub const BASELINE_DBUS_PER_HOUR: f64 = 24.0;

/// Sub-linear performance scaling: a warehouse with 4x the baseline
/// throughput runs identical queries in half the time, not a quarter.
pub fn performance_multiplier(dbus_per_hour: f64) -> f64 {
    (BASELINE_DBUS_PER_HOUR / dbus_per_hour).sqrt()
}

/// T-shirt size of the warehouse, mapping to billed DBUs per hour per cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseSize {
    #[serde(rename = "2XSmall")]
    TwoXSmall,
    XSmall,
    Small,
    Medium,
    Large,
    XLarge,
    #[serde(rename = "2XLarge")]
    TwoXLarge,
    #[serde(rename = "3XLarge")]
    ThreeXLarge,
    #[serde(rename = "4XLarge")]
    FourXLarge,
}

impl WarehouseSize {
    /// Billed capacity-time per hour for one cluster of this size
    pub fn dbus_per_hour(self) -> f64 {
        match self {
            WarehouseSize::TwoXSmall => 4.0,
            WarehouseSize::XSmall => 6.0,
            WarehouseSize::Small => 12.0,
            WarehouseSize::Medium => 24.0,
            WarehouseSize::Large => 40.0,
            WarehouseSize::XLarge => 80.0,
            WarehouseSize::TwoXLarge => 144.0,
            WarehouseSize::ThreeXLarge => 272.0,
            WarehouseSize::FourXLarge => 528.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WarehouseSize::TwoXSmall => "2XSmall",
            WarehouseSize::XSmall => "XSmall",
            WarehouseSize::Small => "Small",
            WarehouseSize::Medium => "Medium",
            WarehouseSize::Large => "Large",
            WarehouseSize::XLarge => "XLarge",
            WarehouseSize::TwoXLarge => "2XLarge",
            WarehouseSize::ThreeXLarge => "3XLarge",
            WarehouseSize::FourXLarge => "4XLarge",
        }
    }
}

impl fmt::Display for WarehouseSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarehouseSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "2XSmall" => Ok(WarehouseSize::TwoXSmall),
            "XSmall" => Ok(WarehouseSize::XSmall),
            "Small" => Ok(WarehouseSize::Small),
            "Medium" => Ok(WarehouseSize::Medium),
            "Large" => Ok(WarehouseSize::Large),
            "XLarge" => Ok(WarehouseSize::XLarge),
            "2XLarge" => Ok(WarehouseSize::TwoXLarge),
            "3XLarge" => Ok(WarehouseSize::ThreeXLarge),
            "4XLarge" => Ok(WarehouseSize::FourXLarge),
            other => Err(format!(
                "unknown warehouse size '{other}' (expected 2XSmall..4XLarge)"
            )),
        }
    }
}

/// Scheduled dashboard-refresh workload parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledWorkloadConfig {
    pub num_dashboards: u32,
    pub refreshes_per_day: u32,

    // Runtime distribution in seconds
    pub avg_refresh_runtime: f64,
    pub refresh_runtime_std: f64,
    pub min_refresh_runtime: f64,
    pub max_refresh_runtime: f64,

    /// 0.0 = refreshes perfectly spread out, 1.0 = jitter spans the full interval
    pub refresh_overlap_factor: f64,
}

impl Default for ScheduledWorkloadConfig {
    fn default() -> Self {
        ScheduledWorkloadConfig {
            num_dashboards: 50,
            refreshes_per_day: 24,
            avg_refresh_runtime: 30.0,
            refresh_runtime_std: 10.0,
            min_refresh_runtime: 5.0,
            max_refresh_runtime: 120.0,
            refresh_overlap_factor: 0.3,
        }
    }
}

/// Ad-hoc interactive query workload parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveWorkloadConfig {
    /// Active users drawn uniformly from [min_users, max_users] per business hour
    pub min_users: u32,
    pub max_users: u32,
    pub queries_per_user_per_hour: f64,

    // Service time distributions in seconds; cache hits are fast, misses slow
    pub cache_hit_rate: f64,
    pub cache_hit_avg_time: f64,
    pub cache_hit_std: f64,
    pub cache_miss_avg_time: f64,
    pub cache_miss_std: f64,

    // Business hours window, hours in 24h format
    pub business_hours_start: u32,
    pub business_hours_end: u32,

    // Auxiliary inference-call usage
    pub inference_fraction: f64,
    pub inference_dbus_per_call: f64,
}

impl Default for InteractiveWorkloadConfig {
    fn default() -> Self {
        InteractiveWorkloadConfig {
            min_users: 15,
            max_users: 30,
            queries_per_user_per_hour: 1.0,
            cache_hit_rate: 0.4,
            cache_hit_avg_time: 2.0,
            cache_hit_std: 0.5,
            cache_miss_avg_time: 8.0,
            cache_miss_std: 3.0,
            business_hours_start: 8,
            business_hours_end: 18,
            inference_fraction: 0.0,
            inference_dbus_per_call: 0.05,
        }
    }
}

/// Warehouse sizing and autoscaling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub size: WarehouseSize,

    /// Queries per cluster the scaler aims for before adding capacity
    pub target_concurrency: u32,

    pub scale_up_threshold: f64,
    pub scale_down_threshold: f64,
    pub scale_up_delay_seconds: f64,
    pub scale_down_delay_seconds: f64,
    pub min_clusters: usize,
    pub max_clusters: usize,

    /// Idle time before an unused cluster is shut down (scale-to-zero path)
    pub idle_shutdown_seconds: f64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        WarehouseConfig {
            size: WarehouseSize::XSmall,
            target_concurrency: 4,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.3,
            scale_up_delay_seconds: 10.0,
            scale_down_delay_seconds: 10.0,
            min_clusters: 0,
            max_clusters: 4,
            idle_shutdown_seconds: 120.0,
        }
    }
}

impl WarehouseConfig {
    pub fn dbus_per_hour(&self) -> f64 {
        self.size.dbus_per_hour()
    }

    /// Execution-time multiplier for this size relative to the baseline
    pub fn performance_multiplier(&self) -> f64 {
        performance_multiplier(self.dbus_per_hour())
    }

    /// Per-cluster capacity, adjusted upward for faster sizes: queries
    /// vacate slots sooner, so a faster warehouse sustains more in-flight
    /// queries per cluster at the same queueing behavior.
    pub fn effective_concurrency(&self) -> u32 {
        let throughput_factor = (self.dbus_per_hour() / BASELINE_DBUS_PER_HOUR).sqrt();
        let adjusted = (self.target_concurrency as f64 * throughput_factor).round() as u32;
        adjusted.max(2)
    }
}

/// Pricing rates in dollars per DBU
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub dbu_rate: f64,
    pub inference_dbu_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            dbu_rate: 0.70,
            inference_dbu_rate: 0.70,
        }
    }
}

/// Overall simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub days: u32,
    /// Seconds per simulation step
    pub time_step_seconds: f64,
    pub seed: u64,

    pub scheduled: ScheduledWorkloadConfig,
    pub interactive: InteractiveWorkloadConfig,
    pub warehouse: WarehouseConfig,
    pub pricing: PricingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            days: 7,
            time_step_seconds: 10.0,
            seed: 42,
            scheduled: ScheduledWorkloadConfig::default(),
            interactive: InteractiveWorkloadConfig::default(),
            warehouse: WarehouseConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Total simulated horizon in seconds
    pub fn total_seconds(&self) -> f64 {
        self.days as f64 * 86_400.0
    }

    /// Number of steps the driver advances past t = 0
    pub fn num_steps(&self) -> u64 {
        (self.total_seconds() / self.time_step_seconds).ceil() as u64
    }

    /// Load overrides from a JSON file on top of the defaults and validate
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range or contradictory parameters before the run starts
    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(SimError::config("must simulate at least one day"));
        }
        if self.time_step_seconds <= 0.0 {
            return Err(SimError::config("time step must be positive"));
        }

        let s = &self.scheduled;
        if s.num_dashboards == 0 {
            return Err(SimError::config("must have at least one dashboard"));
        }
        if s.refreshes_per_day == 0 {
            return Err(SimError::config("must have at least one refresh per day"));
        }
        if s.avg_refresh_runtime <= 0.0 || s.min_refresh_runtime <= 0.0 {
            return Err(SimError::config("refresh runtimes must be positive"));
        }
        if s.refresh_runtime_std < 0.0 {
            return Err(SimError::config("refresh runtime stddev must be non-negative"));
        }
        if s.min_refresh_runtime > s.max_refresh_runtime {
            return Err(SimError::config(
                "min refresh runtime must not exceed max refresh runtime",
            ));
        }
        if !(0.0..=1.0).contains(&s.refresh_overlap_factor) {
            return Err(SimError::config("refresh overlap factor must be in [0, 1]"));
        }

        let i = &self.interactive;
        if i.min_users > i.max_users {
            return Err(SimError::config("min users must not exceed max users"));
        }
        if i.queries_per_user_per_hour <= 0.0 {
            return Err(SimError::config("queries per user per hour must be positive"));
        }
        if !(0.0..=1.0).contains(&i.cache_hit_rate) {
            return Err(SimError::config("cache hit rate must be in [0, 1]"));
        }
        if i.cache_hit_avg_time <= 0.0 || i.cache_miss_avg_time <= 0.0 {
            return Err(SimError::config("cache service times must be positive"));
        }
        if i.cache_hit_std < 0.0 || i.cache_miss_std < 0.0 {
            return Err(SimError::config("cache service stddevs must be non-negative"));
        }
        if i.business_hours_start >= i.business_hours_end || i.business_hours_end > 24 {
            return Err(SimError::config(
                "business hours must satisfy 0 <= start < end <= 24",
            ));
        }
        if !(0.0..=1.0).contains(&i.inference_fraction) {
            return Err(SimError::config("inference fraction must be in [0, 1]"));
        }
        if i.inference_dbus_per_call < 0.0 {
            return Err(SimError::config("inference DBUs per call must be non-negative"));
        }

        let w = &self.warehouse;
        if w.target_concurrency == 0 {
            return Err(SimError::config("target concurrency must be positive"));
        }
        if w.min_clusters > w.max_clusters {
            return Err(SimError::config("min clusters must not exceed max clusters"));
        }
        if w.max_clusters == 0 {
            return Err(SimError::config("max clusters must be positive"));
        }
        if w.scale_down_threshold >= w.scale_up_threshold {
            return Err(SimError::config(
                "scale-down threshold must be below scale-up threshold",
            ));
        }
        if w.scale_up_delay_seconds < 0.0 || w.scale_down_delay_seconds < 0.0 {
            return Err(SimError::config("scaling delays must be non-negative"));
        }
        if w.idle_shutdown_seconds <= 0.0 {
            return Err(SimError::config("idle shutdown must be positive"));
        }

        let p = &self.pricing;
        if p.dbu_rate <= 0.0 {
            return Err(SimError::config("DBU rate must be positive"));
        }
        if p.inference_dbu_rate <= 0.0 {
            return Err(SimError::config("inference DBU rate must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_size_dbu_mapping() {
        assert_eq!(WarehouseSize::TwoXSmall.dbus_per_hour(), 4.0);
        assert_eq!(WarehouseSize::Medium.dbus_per_hour(), 24.0);
        assert_eq!(WarehouseSize::FourXLarge.dbus_per_hour(), 528.0);
    }

    #[test]
    fn test_size_round_trip() {
        for size in [
            WarehouseSize::TwoXSmall,
            WarehouseSize::XSmall,
            WarehouseSize::Small,
            WarehouseSize::Medium,
            WarehouseSize::Large,
            WarehouseSize::XLarge,
            WarehouseSize::TwoXLarge,
            WarehouseSize::ThreeXLarge,
            WarehouseSize::FourXLarge,
        ] {
            assert_eq!(size.as_str().parse::<WarehouseSize>(), Ok(size));
        }
        assert!("Gigantic".parse::<WarehouseSize>().is_err());
    }

    #[test]
    fn test_performance_multiplier_sublinear() {
        // 4x the baseline throughput halves execution time
        assert!((performance_multiplier(4.0 * BASELINE_DBUS_PER_HOUR) - 0.5).abs() < 1e-12);
        // Baseline is 1.0
        assert!((performance_multiplier(BASELINE_DBUS_PER_HOUR) - 1.0).abs() < 1e-12);
        // Smaller warehouses are slower
        assert!(performance_multiplier(4.0) > 2.0);
    }

    #[test]
    fn test_effective_concurrency_scaling() {
        let mut warehouse = WarehouseConfig::default();

        warehouse.size = WarehouseSize::Medium;
        assert_eq!(warehouse.effective_concurrency(), 4);

        // XLarge: 4 * sqrt(80/24) = 7.3 -> 7
        warehouse.size = WarehouseSize::XLarge;
        assert_eq!(warehouse.effective_concurrency(), 7);

        // 2XSmall: 4 * sqrt(4/24) = 1.6 -> 2, held at the floor of 2
        warehouse.size = WarehouseSize::TwoXSmall;
        assert_eq!(warehouse.effective_concurrency(), 2);
    }

    #[test]
    fn test_rejects_contradictory_clusters() {
        let mut config = SimulationConfig::default();
        config.warehouse.min_clusters = 5;
        config.warehouse.max_clusters = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = SimulationConfig::default();
        config.warehouse.scale_down_threshold = 0.9;
        config.warehouse.scale_up_threshold = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_business_hours() {
        let mut config = SimulationConfig::default();
        config.interactive.business_hours_start = 18;
        config.interactive.business_hours_end = 8;
        assert!(config.validate().is_err());

        config.interactive.business_hours_start = 8;
        config.interactive.business_hours_end = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_probabilities() {
        let mut config = SimulationConfig::default();
        config.interactive.cache_hit_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.scheduled.refresh_overlap_factor = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_horizon_arithmetic() {
        let mut config = SimulationConfig::default();
        config.days = 2;
        config.time_step_seconds = 10.0;
        assert_eq!(config.total_seconds(), 172_800.0);
        assert_eq!(config.num_steps(), 17_280);
    }
}
