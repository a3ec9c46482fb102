//! Custom error types for s2harvest.
//!
//! Every fallible library function returns `Result<T, HarvestError>`.
//! Recoverable API conditions (rate limiting, the 400 "no data" sentinel,
//! retry exhaustion) never show up here; they are handled inside the
//! fetchers and only fatal conditions are surfaced.

use thiserror::Error;

/// Main error type for s2harvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Transport-level failure (connection, TLS, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// API answered with a status the endpoint does not tolerate
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Human readable context
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid base URL or endpoint path
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `HarvestError`
pub type Result<T> = std::result::Result<T, HarvestError>;
