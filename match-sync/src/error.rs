/// Error types for the match-sync library
use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur in match-sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Zenoh-related errors
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// Invalid match identifier provided
    #[error("Invalid match id: {0}. Must be a valid single-chunk keyexpr (no /, *, $, ?, #, @)")]
    InvalidMatchId(String),

    /// Invalid player slot number
    #[error("Invalid player slot: {0}. Must be 1 or 2")]
    InvalidSlot(u8),

    /// Invalid keyexpr pattern
    #[error("Invalid keyexpr: {0}")]
    InvalidKeyexpr(String),

    /// The store rejected or could not serve the request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A row that was expected to exist is missing
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}
