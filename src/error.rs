//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid menu response: {0}")]
    InvalidMenu(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    /// Whether the remote service asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
