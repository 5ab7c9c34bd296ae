//! Error types for commune-core

use thiserror::Error;

/// Result type alias using commune-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local (non-network) operations such as the keyed store
/// and configuration loading.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected store key or similar caller mistake
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
