//! Error types for the simulation engine

use thiserror::Error;

/// Simulation result type
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while configuring or running a simulation
#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration error, detected before the run starts
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid distribution parameters while building a generator
    #[error("distribution error: {0}")]
    Distribution(String),

    /// Internal impossibility indicating a logic defect, aborts the run
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// IO error while exporting results
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a distribution error
    pub fn distribution(msg: impl Into<String>) -> Self {
        Self::Distribution(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
