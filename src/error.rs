//! Error types for the povar crawler
//!
//! Domain-specific errors are defined per failure class (fetching,
//! validation, persistence, scheduling) and wrapped into a unified [`Error`]
//! enum for use across module boundaries.
//!
//! The retry policy keys off the error class, not individual variants: any
//! [`FetchError`] fails the owning task and makes it eligible for retry,
//! a [`ValidationError`] only drops the offending item, and persistence or
//! queue errors are logged and never escalate to process termination.

use thiserror::Error;

/// Errors that can occur while fetching a listing page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server responded with a non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request or task deadline exceeded
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Malformed CSS selector
    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Item-scoped validation errors
///
/// An invalid item is dropped from its batch; the owning task is not failed
/// because of it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty after normalization
    #[error("item name is empty")]
    EmptyName,

    /// Href is empty after trimming
    #[error("item href is empty")]
    EmptyHref,
}

/// Errors raised by a persistence sink
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sink rejected the batch for a non-database reason
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Scheduling lifecycle errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The controller is a single-use lifecycle object
    #[error("task controller already started")]
    AlreadyStarted,

    /// Enqueue attempted after the task queue was closed
    #[error("task queue is closed")]
    QueueClosed,
}

/// Unified error type for the povar crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Scheduler lifecycle errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = SchedulerError::QueueClosed.into();
        assert!(matches!(err, Error::Scheduler(SchedulerError::QueueClosed)));

        let err: Error = ValidationError::EmptyName.into();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::from(FetchError::ServerError(503));
        assert_eq!(err.to_string(), "Fetch error: Server error: 503");

        let err = Error::config("bad rate limit");
        assert_eq!(err.to_string(), "Config error: bad rate limit");
    }

    #[test]
    fn test_validation_display() {
        assert_eq!(ValidationError::EmptyName.to_string(), "item name is empty");
        assert_eq!(ValidationError::EmptyHref.to_string(), "item href is empty");
    }
}
