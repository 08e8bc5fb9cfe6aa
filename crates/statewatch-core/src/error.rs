//! Error types for statewatch

use thiserror::Error;

/// Result type alias using statewatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for statewatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// A probe check failed (network, timeout, or parse)
    #[error("Probe error: {0}")]
    Probe(String),

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Dispatch(#[from] crate::notify::NotifyError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found error
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
