// src/models/mod.rs

//! Domain models for the review desk.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod stats;
mod submission;

// Re-export all public types
pub use config::{ApiConfig, Config, ExportConfig, LoggingConfig};
pub use stats::{AdminStats, StatsSnapshot, StatsSource, approval_rate};
pub use submission::{ReviewState, ReviewStatus, Submission, Submitter, UNKNOWN_SUBMITTER};
