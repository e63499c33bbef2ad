use thiserror::Error;

/// Fatal engine errors.
///
/// Only configuration-level problems end up here. Bad data is collected
/// into normalization failures and the quality report instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid band scheme for metric '{metric}': {reason}")]
    InvalidBands { metric: String, reason: String },

    #[error("Invalid simulation parameter '{parameter}': {reason}")]
    InvalidSimulation { parameter: &'static str, reason: String },

    #[error("Simulation horizon {horizon_days} days exceeds the configured cap of {cap} days")]
    HorizonExceedsCap { horizon_days: u32, cap: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
