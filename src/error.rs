//! Custom error types for landscape-metrics.
//!
//! This module defines all error types used throughout the crate.
//! Functions return `Result<T, LandscapeError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for landscape-metrics operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum LandscapeError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by a collector backend
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Collector backend returned an error status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// A source has no data for the project (missing snapshot, not found)
    #[error("Source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        /// Source that failed
        source_name: String,
        /// Reason reported by the collector
        message: String,
    },

    /// Parse error (periods, identifiers, URLs)
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error (schema violations, bad arguments)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `LandscapeError`
pub type Result<T> = std::result::Result<T, LandscapeError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LandscapeError::Parse(msg.to_string()))
    }
}
