//! Core error types for timecue-core.
//!
//! Load-time failures (config, timetable) are surfaced to the caller.
//! Composition failures never escape the LLM client; [`ComposeError`] only
//! describes a single failed attempt and ends up inside a
//! [`crate::llm::ComposeOutcome::Failed`] diagnostic.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timecue-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timetable loading errors
    #[error("Timetable error: {0}")]
    Timetable(#[from] TimetableError),

}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not determine the configuration directory
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Timetable loading errors.
///
/// A single malformed entry is not an error: it is skipped and recorded on
/// the [`crate::timetable::Timetable`].
#[derive(Error, Debug)]
pub enum TimetableError {
    /// Timetable file missing or unreadable
    #[error("Failed to read timetable at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Timetable is not a JSON array of entries
    #[error("Invalid timetable JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No usable entries to schedule against
    #[error("Timetable at {path} has no usable entries")]
    Empty { path: PathBuf },
}

/// Failure of one composition attempt.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// No API key in the environment
    #[error("API key not set (expected in ${env})")]
    MissingApiKey { env: String },

    /// Transport-level failure (connect, TLS, body read)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Attempt exceeded its time budget
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Response carried no usable text
    #[error("empty response content")]
    EmptyResponse,
}

impl ComposeError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ComposeError::MissingApiKey { .. } | ComposeError::EmptyResponse
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
