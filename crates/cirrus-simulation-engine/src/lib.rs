//! Cirrus Simulation Engine
//!
//! Discrete-event simulator for autoscaling serverless SQL warehouse
//! cost modeling: a seeded workload of scheduled and interactive queries
//! drives an autoscaling cluster pool, and the run reports queuing delay,
//! utilization, and billed resource-time.

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod rng;
pub mod simulator;
pub mod types;
pub mod warehouse;
