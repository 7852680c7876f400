//! Workload generation: scheduled dashboard refreshes and interactive queries
//!
//! The full workload is produced up front, before the simulation runs, as a
//! time-ordered sequence of query descriptors. For a fixed seed the stream
//! is consumed in one documented order (all scheduled draws, then all
//! interactive draws), which makes the generated workload byte-identical
//! across runs.

use rand_distr::{Normal, Poisson};

use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::rng::RandomStream;
use crate::types::{Query, QueryKind};

/// Floor for degenerate duration draws; never surfaced as an error
const MIN_QUERY_DURATION: f64 = 0.1;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Generates the query workload for a simulation run
pub struct EventGenerator {
    horizon: f64,
    days: u32,
    num_dashboards: u32,
    refreshes_per_day: u32,
    refresh_overlap_factor: f64,
    min_refresh_runtime: f64,
    max_refresh_runtime: f64,
    min_users: u32,
    max_users: u32,
    cache_hit_rate: f64,
    business_hours_start: u32,
    business_hours_end: u32,
    inference_fraction: f64,

    /// Execution-time scaling for the configured warehouse size, applied
    /// once per generated query
    performance_multiplier: f64,

    refresh_runtime: Normal<f64>,
    cache_hit_time: Normal<f64>,
    cache_miss_time: Normal<f64>,
    queries_per_user: Poisson<f64>,
}

impl EventGenerator {
    /// Build a generator from a validated configuration
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        let s = &config.scheduled;
        let i = &config.interactive;

        let refresh_runtime = Normal::new(s.avg_refresh_runtime, s.refresh_runtime_std)
            .map_err(|e| SimError::distribution(format!("refresh runtime: {e}")))?;
        let cache_hit_time = Normal::new(i.cache_hit_avg_time, i.cache_hit_std)
            .map_err(|e| SimError::distribution(format!("cache hit time: {e}")))?;
        let cache_miss_time = Normal::new(i.cache_miss_avg_time, i.cache_miss_std)
            .map_err(|e| SimError::distribution(format!("cache miss time: {e}")))?;
        let queries_per_user = Poisson::new(i.queries_per_user_per_hour)
            .map_err(|e| SimError::distribution(format!("queries per user: {e}")))?;

        Ok(EventGenerator {
            horizon: config.total_seconds(),
            days: config.days,
            num_dashboards: s.num_dashboards,
            refreshes_per_day: s.refreshes_per_day,
            refresh_overlap_factor: s.refresh_overlap_factor,
            min_refresh_runtime: s.min_refresh_runtime,
            max_refresh_runtime: s.max_refresh_runtime,
            min_users: i.min_users,
            max_users: i.max_users,
            cache_hit_rate: i.cache_hit_rate,
            business_hours_start: i.business_hours_start,
            business_hours_end: i.business_hours_end,
            inference_fraction: i.inference_fraction,
            performance_multiplier: config.warehouse.performance_multiplier(),
            refresh_runtime,
            cache_hit_time,
            cache_miss_time,
            queries_per_user,
        })
    }

    pub fn performance_multiplier(&self) -> f64 {
        self.performance_multiplier
    }

    /// Generate the merged, time-sorted workload for the whole horizon
    pub fn generate(&self, stream: &mut RandomStream) -> Vec<Query> {
        let mut next_id = 0u64;
        let mut queries = self.generate_scheduled(stream, &mut next_id);
        queries.extend(self.generate_interactive(stream, &mut next_id));
        queries.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        queries
    }

    /// Scheduled stream: each dashboard refreshes on a fixed cadence, with
    /// refreshes jittered uniformly inside the overlap window. Dashboards
    /// are staggered across the interval so a zero overlap factor yields a
    /// perfectly even spread.
    pub fn generate_scheduled(&self, stream: &mut RandomStream, next_id: &mut u64) -> Vec<Query> {
        let mut queries = Vec::new();
        let interval = SECONDS_PER_DAY / self.refreshes_per_day as f64;
        let half_window = self.refresh_overlap_factor * interval / 2.0;
        let refreshes = (self.refreshes_per_day * self.days) as u64;

        for dashboard_id in 0..self.num_dashboards {
            let base_offset = dashboard_id as f64 * interval / self.num_dashboards as f64;

            for refresh_num in 0..refreshes {
                let mut refresh_time = refresh_num as f64 * interval + base_offset;
                if self.refresh_overlap_factor > 0.0 {
                    refresh_time += stream.uniform(-half_window, half_window);
                }

                // Jitter can push a refresh outside the simulation window
                if refresh_time < 0.0 || refresh_time >= self.horizon {
                    continue;
                }

                let raw = stream.normal(&self.refresh_runtime);
                let runtime = raw.clamp(self.min_refresh_runtime, self.max_refresh_runtime)
                    * self.performance_multiplier;

                queries.push(Query::new(
                    *next_id,
                    QueryKind::Scheduled,
                    refresh_time,
                    runtime,
                ));
                *next_id += 1;
            }
        }

        queries.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        queries
    }

    /// Interactive stream: for every business hour, a uniform draw of active
    /// users, a Poisson query count per user, and uniform arrivals within
    /// the hour. Durations are bimodal on cache hit/miss.
    pub fn generate_interactive(&self, stream: &mut RandomStream, next_id: &mut u64) -> Vec<Query> {
        let mut queries = Vec::new();
        let total_hours = (self.horizon / SECONDS_PER_HOUR).ceil() as u64;

        for hour in 0..total_hours {
            let hour_of_day = (hour % 24) as u32;
            if hour_of_day < self.business_hours_start || hour_of_day >= self.business_hours_end {
                continue;
            }

            let window_start = hour as f64 * SECONDS_PER_HOUR;
            let users = stream.uniform_u32(self.min_users, self.max_users);

            for _ in 0..users {
                let count = stream.poisson(&self.queries_per_user);

                for _ in 0..count {
                    let arrival = stream.uniform(window_start, window_start + SECONDS_PER_HOUR);
                    if arrival >= self.horizon {
                        continue;
                    }

                    let raw = if stream.chance(self.cache_hit_rate) {
                        stream.normal(&self.cache_hit_time)
                    } else {
                        stream.normal(&self.cache_miss_time)
                    };
                    let duration = raw.max(MIN_QUERY_DURATION) * self.performance_multiplier;

                    let mut query =
                        Query::new(*next_id, QueryKind::Interactive, arrival, duration);
                    query.uses_inference = stream.chance(self.inference_fraction);
                    *next_id += 1;
                    queries.push(query);
                }
            }
        }

        queries.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        queries
    }
}
