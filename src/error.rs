//! Error types for the garden directory

use thiserror::Error;

/// Result type for directory operations
pub type Result<T> = std::result::Result<T, GardenError>;

/// Directory error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GardenError {
    /// The routed garden could not be resolved (missing or unreachable)
    #[error("Garden not found: {0}")]
    GardenNotFound(String),

    /// Transport error or unexpected HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Indexer answered with GraphQL errors
    #[error("Indexer error: {0}")]
    Indexer(String),

    /// No configuration for the requested chain
    #[error("Unknown network: chain id {0}")]
    UnknownNetwork(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A garden-scoped provider refused to activate
    #[error("Scope {scope} failed to activate: {reason}")]
    Scope { scope: String, reason: String },
}

impl GardenError {
    /// Whether this error is the user-facing "garden not found" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, GardenError::GardenNotFound(_))
    }
}

impl From<reqwest::Error> for GardenError {
    fn from(err: reqwest::Error) -> Self {
        GardenError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GardenError {
    fn from(err: serde_json::Error) -> Self {
        GardenError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for GardenError {
    fn from(err: toml::de::Error) -> Self {
        GardenError::Config(err.to_string())
    }
}
