// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Registration or enqueue refused by the runtime's current state
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
