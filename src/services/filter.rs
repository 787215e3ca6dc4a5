// src/services/filter.rs

//! Submission filtering.
//!
//! Filtering is a pure function of the submission list, the filter and the
//! reference time. Output keeps input order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{AppError, Result};
use crate::models::{ReviewStatus, Submission};

/// Status axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReviewStatus),
}

impl StatusFilter {
    fn matches(&self, status: ReviewStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => write!(f, "{status}"),
        }
    }
}

/// Date-range axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    /// Same calendar date as now
    Today,
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
}

impl DateFilter {
    fn matches<Tz: TimeZone>(&self, created_at: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        let now_utc = now.with_timezone(&Utc);
        match self {
            DateFilter::All => true,
            DateFilter::Today => {
                created_at.with_timezone(&now.timezone()).date_naive() == now.date_naive()
            }
            DateFilter::Week => *created_at >= now_utc - Duration::days(7),
            DateFilter::Month => *created_at >= now_utc - Duration::days(30),
        }
    }
}

impl FromStr for DateFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "week" => Ok(DateFilter::Week),
            "month" => Ok(DateFilter::Month),
            other => Err(AppError::validation(format!(
                "unknown date filter '{other}' (expected all, today, week or month)"
            ))),
        }
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateFilter::All => "all",
            DateFilter::Today => "today",
            DateFilter::Week => "week",
            DateFilter::Month => "month",
        })
    }
}

/// The three filter axes, combined with AND.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionFilter {
    pub search: String,
    pub status: StatusFilter,
    pub date: DateFilter,
}

impl SubmissionFilter {
    pub fn new(search: impl Into<String>, status: StatusFilter, date: DateFilter) -> Self {
        Self {
            search: search.into(),
            status,
            date,
        }
    }

    /// Case-insensitive substring match on name, slug or submitter name.
    fn matches_search(&self, needle: &str, submission: &Submission) -> bool {
        if needle.is_empty() {
            return true;
        }
        submission.name.to_lowercase().contains(needle)
            || submission.slug.to_lowercase().contains(needle)
            || submission
                .created_by
                .as_ref()
                .is_some_and(|user| user.name.to_lowercase().contains(needle))
    }

    fn passes<Tz: TimeZone>(&self, needle: &str, submission: &Submission, now: &DateTime<Tz>) -> bool {
        self.matches_search(needle, submission)
            && self.status.matches(submission.status())
            && self.date.matches(&submission.created_at, now)
    }
}

/// Subset of `submissions` passing `filter`, in input order.
pub fn visible<Tz: TimeZone>(
    submissions: &[Submission],
    filter: &SubmissionFilter,
    now: &DateTime<Tz>,
) -> Vec<Submission> {
    let needle = filter.search.trim().to_lowercase();
    submissions
        .iter()
        .filter(|s| filter.passes(&needle, s, now))
        .cloned()
        .collect()
}
