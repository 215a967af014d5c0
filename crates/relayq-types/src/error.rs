//! Error types for RelayQ
//!
//! Defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for RelayQ operations
#[derive(Error, Debug)]
pub enum Error {
    /// The admission gate was closed while a message was waiting for a slot.
    /// Fatal for the consuming process: no further messages can be admitted.
    #[error("admission gate closed")]
    GateClosed,

    /// A sink failed to publish a payload
    #[error("sink publish failed: {0}")]
    Sink(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for RelayQ operations
pub type Result<T> = std::result::Result<T, Error>;
