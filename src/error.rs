//! Error types for Gluco Flux

use thiserror::Error;

/// Errors that can occur while ingesting readings or running the pipeline
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse reading payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] crate::schema::ValidationError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Errors raised when a configuration value is out of bounds
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Hypoglycemia threshold ({hypo}) must be below hyperglycemia threshold ({hyper})")]
    InvertedThresholds { hypo: f64, hyper: f64 },

    #[error("{0} must be a positive number")]
    NonPositive(&'static str),

    #[error("{0} must be a percentage between 0 and 100")]
    PercentageOutOfRange(&'static str),

    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: String, value: String },
}

/// Errors reported by a chat transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Chat transport rejected the message: {0}")]
    Rejected(String),

    #[error("Chat transport unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while dispatching a chunked message
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to send chunk {chunk_index} of {total_chunks}: {source}")]
    Transport {
        chunk_index: usize,
        total_chunks: usize,
        #[source]
        source: TransportError,
    },

    #[error("Failed to send typing indicator: {0}")]
    Typing(#[source] TransportError),
}
