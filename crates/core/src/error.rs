//! Error handling for the TextProof core library

use thiserror::Error;

/// Result type alias for TextProof operations
pub type Result<T> = std::result::Result<T, ProofError>;

/// Failure raised by a model provider adapter.
///
/// This is a closed sum: adapters build the variant explicitly from the wire
/// failure they observed, and the engine dispatches on it without inspecting
/// message strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network-layer failure. Fatal for the current task: the engine stops
    /// processing remaining units once an exhausted retry ends here.
    #[error("connection error: {0}")]
    Connection(String),

    /// Transient 5xx-style failure. Retried; three consecutive occurrences
    /// trip the engine's circuit-breaker.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other provider failure. Retried like `ServiceUnavailable`.
    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    /// Create a service-unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Create a generic provider error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Whether the current task should give up on its remaining units
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Main error type for TextProof operations
#[derive(Error, Debug)]
pub enum ProofError {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider adapter errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Every unit of a correction run failed
    #[error("Correction failed: {message}")]
    Engine { message: String },

    /// Durable store errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl ProofError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an engine error
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
