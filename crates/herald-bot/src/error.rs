//! Application-wide error types using thiserror.

use herald_common::HeraldError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] HeraldError),

    /// Gateway wiring error.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;
