//! Dashboard API transport.
//!
//! - `ReviewApi`: the calls the desk issues against the external API
//! - `HttpReviewApi`: reqwest implementation
//!
//! Implementations map HTTP 401 to `AppError::Unauthorized`, other failures
//! of the two loads to `StatsUnavailable`/`SubmissionsUnavailable` and
//! failures of review actions to `ActionFailed`.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{AdminStats, ReviewStatus, Submission};

pub use http::HttpReviewApi;

/// Body of a review call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    pub status: ReviewStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_note: Option<String>,
}

impl ReviewDecision {
    pub fn approve() -> Self {
        Self {
            status: ReviewStatus::Approved,
            rejection_note: None,
        }
    }

    pub fn reject(note: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Rejected,
            rejection_note: Some(note.into()),
        }
    }
}

/// Calls issued against the dashboard API. Every call carries a bearer token.
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// `GET /api/country/dashboard/admin-stats`
    async fn admin_stats(&self, token: &str) -> Result<AdminStats>;

    /// `GET /api/country/dashboard/all?limit=<n>`
    async fn submissions(&self, token: &str, limit: usize) -> Result<Vec<Submission>>;

    /// `PUT /api/country/dashboard/review/{id}`
    async fn review(&self, token: &str, id: &str, decision: &ReviewDecision) -> Result<()>;

    /// `DELETE /api/countries/{id}`
    async fn delete(&self, token: &str, id: &str) -> Result<()>;
}
