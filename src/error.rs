// src/error.rs

//! Unified error handling for the review desk.

use std::fmt;

use thiserror::Error;

/// Result type alias for review desk operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No usable token, or the API answered 401
    #[error("Unauthorized: please log in again")]
    Unauthorized,

    /// Aggregate stats could not be loaded (non-blocking)
    #[error("Stats unavailable: {0}")]
    StatsUnavailable(String),

    /// Submission list could not be loaded (blocking)
    #[error("Failed to load submissions: {0}")]
    SubmissionsUnavailable(String),

    /// Approve/reject/delete call failed on the server side
    #[error("{message}")]
    ActionFailed { message: String },

    /// Another review action is still outstanding
    #[error("Another review action is in progress (submission {id})")]
    ActionInProgress { id: String },

    /// The submission list is being reloaded
    #[error("Submissions are being reloaded, try again")]
    RefreshInProgress,

    /// Submission is not in the local cache
    #[error("Submission not found: {0}")]
    NotFound(String),

    /// Review action on an already decided submission
    #[error("Submission {id} is already {status}")]
    InvalidTransition { id: String, status: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSV writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a stats failure.
    pub fn stats(message: impl fmt::Display) -> Self {
        Self::StatsUnavailable(message.to_string())
    }

    /// Create a submission list failure.
    pub fn submissions(message: impl fmt::Display) -> Self {
        Self::SubmissionsUnavailable(message.to_string())
    }

    /// Create a failed review action error.
    pub fn action(message: impl Into<String>) -> Self {
        Self::ActionFailed {
            message: message.into(),
        }
    }

    /// Create a transition error for a decided submission.
    pub fn transition(id: impl Into<String>, status: impl fmt::Display) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            status: status.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller should send the user back to login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
