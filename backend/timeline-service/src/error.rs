/// Error types for timeline-service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for timeline-service operations
pub type Result<T> = std::result::Result<T, AppError>;
