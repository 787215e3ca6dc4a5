//! Aggregate review statistics.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ReviewStatus, Submission};

/// Aggregate counts over the submission collection.
///
/// Every field is optional on the wire and defaults to zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_submissions: u64,
    pub pending_submissions: u64,
    pub approved_submissions: u64,
    pub rejected_submissions: u64,

    /// Only known to the API; zero when derived locally
    pub total_users: u64,

    pub new_submissions_today: u64,

    /// Percentage of approved submissions, 0-100
    pub approval_rate: f64,

    /// Remote-only metric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_review_time: Option<f64>,
}

impl AdminStats {
    /// Derive stats from a list of submissions.
    ///
    /// "Today" is the calendar date of `now` in `now`'s time zone.
    pub fn derive<Tz: TimeZone>(submissions: &[Submission], now: &DateTime<Tz>) -> Self {
        let mut stats = AdminStats {
            total_submissions: submissions.len() as u64,
            ..AdminStats::default()
        };

        let today = now.date_naive();
        let tz = now.timezone();

        for submission in submissions {
            match submission.status() {
                ReviewStatus::Pending => stats.pending_submissions += 1,
                ReviewStatus::Approved => stats.approved_submissions += 1,
                ReviewStatus::Rejected => stats.rejected_submissions += 1,
            }
            if submission.created_at.with_timezone(&tz).date_naive() == today {
                stats.new_submissions_today += 1;
            }
        }

        stats.approval_rate = approval_rate(stats.approved_submissions, stats.total_submissions);
        stats
    }
}

/// `round(approved / total * 100)`, or 0 when there is nothing to rate.
pub fn approval_rate(approved: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let approved = approved.min(total);
    ((approved as f64 / total as f64) * 100.0).round()
}

/// Where a stats snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    /// Returned by the admin-stats endpoint
    Remote,
    /// Computed from the cached submission list
    Derived,
}

/// Stats plus a "last updated" marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub stats: AdminStats,
    pub source: StatsSource,
    pub updated_at: DateTime<Utc>,
}

impl StatsSnapshot {
    pub fn remote(stats: AdminStats) -> Self {
        Self {
            stats,
            source: StatsSource::Remote,
            updated_at: Utc::now(),
        }
    }

    /// Stats derived from `submissions` as of `now`.
    pub fn derived<Tz: TimeZone>(submissions: &[Submission], now: &DateTime<Tz>) -> Self {
        Self {
            stats: AdminStats::derive(submissions, now),
            source: StatsSource::Derived,
            updated_at: now.with_timezone(&Utc),
        }
    }
}
