use thiserror::Error;

/// Top-level error type for Tolmach.
#[derive(Debug, Error)]
pub enum TolmachError {
    /// Error from the translation backend (transport, status, or payload).
    #[error("backend error: {0}")]
    Backend(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// User settings storage error.
    #[error("settings error: {0}")]
    Settings(String),

    /// Failed to obtain a credential for the backend.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Rejected user input (unknown or empty language code, etc).
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
