//! Submission data structure and its review state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

/// Label used wherever the submitter is not known.
pub const UNKNOWN_SUBMITTER: &str = "Unknown";

/// Flat review status as it travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(AppError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// The user who proposed a country page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Submitter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Review state of a submission.
///
/// Only `Pending` submissions can move; both decided states are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    Approved {
        reviewed_at: Option<DateTime<Utc>>,
        reviewed_by: Option<String>,
    },
    Rejected {
        reviewed_at: Option<DateTime<Utc>>,
        note: String,
    },
}

impl ReviewState {
    pub fn status(&self) -> ReviewStatus {
        match self {
            ReviewState::Pending => ReviewStatus::Pending,
            ReviewState::Approved { .. } => ReviewStatus::Approved,
            ReviewState::Rejected { .. } => ReviewStatus::Rejected,
        }
    }
}

/// A country page proposal awaiting (or past) editorial review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubmissionRecord", into = "SubmissionRecord")]
pub struct Submission {
    /// Identifier assigned by the API
    pub id: String,

    /// Country display name
    pub name: String,

    /// URL-safe identifier derived from the name
    pub slug: String,

    /// Submitting user, if the API knows it
    pub created_by: Option<Submitter>,

    /// Submission time
    pub created_at: DateTime<Utc>,

    /// Current review state
    pub review: ReviewState,
}

impl Submission {
    /// Create a pending submission.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        slug: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            created_by: None,
            created_at,
            review: ReviewState::Pending,
        }
    }

    /// Attach the submitting user.
    pub fn with_submitter(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.created_by = Some(Submitter {
            name: name.into(),
            email: email.into(),
        });
        self
    }

    pub fn status(&self) -> ReviewStatus {
        self.review.status()
    }

    pub fn is_pending(&self) -> bool {
        self.review == ReviewState::Pending
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        match &self.review {
            ReviewState::Pending => None,
            ReviewState::Approved { reviewed_at, .. } | ReviewState::Rejected { reviewed_at, .. } => {
                *reviewed_at
            }
        }
    }

    pub fn rejection_note(&self) -> Option<&str> {
        match &self.review {
            ReviewState::Rejected { note, .. } => Some(note.as_str()),
            _ => None,
        }
    }

    /// Submitter name, or `"Unknown"` when absent.
    pub fn submitted_by(&self) -> &str {
        self.created_by
            .as_ref()
            .map(|u| u.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_SUBMITTER)
    }

    /// Move a pending submission to `Approved`.
    pub fn approve(&mut self, at: DateTime<Utc>, by: Option<String>) -> Result<()> {
        self.ensure_pending()?;
        self.review = ReviewState::Approved {
            reviewed_at: Some(at),
            reviewed_by: by,
        };
        Ok(())
    }

    /// Move a pending submission to `Rejected`. The note must not be blank.
    pub fn reject(&mut self, at: DateTime<Utc>, note: &str) -> Result<()> {
        self.ensure_pending()?;
        let note = note.trim();
        if note.is_empty() {
            return Err(AppError::validation("rejection note is required"));
        }
        self.review = ReviewState::Rejected {
            reviewed_at: Some(at),
            note: note.to_string(),
        };
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(AppError::transition(&self.id, self.status()))
        }
    }
}

/// Flat JSON shape used by the dashboard API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionRecord {
    #[serde(alias = "_id")]
    id: String,

    name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    slug: String,

    #[serde(default, deserialize_with = "null_as_default")]
    status: ReviewStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<Submitter>,

    created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    reviewed_at: Option<DateTime<Utc>>,

    /// Either a plain name/id or a user object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reviewed_by: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejection_note: Option<String>,
}

fn actor_name(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("email"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

impl From<SubmissionRecord> for Submission {
    fn from(record: SubmissionRecord) -> Self {
        let review = match record.status {
            ReviewStatus::Pending => ReviewState::Pending,
            ReviewStatus::Approved => ReviewState::Approved {
                reviewed_at: record.reviewed_at,
                reviewed_by: record.reviewed_by.and_then(actor_name),
            },
            ReviewStatus::Rejected => ReviewState::Rejected {
                reviewed_at: record.reviewed_at,
                note: record.rejection_note.unwrap_or_default(),
            },
        };

        Self {
            id: record.id,
            name: record.name,
            slug: record.slug,
            created_by: record.created_by,
            created_at: record.created_at,
            review,
        }
    }
}

impl From<Submission> for SubmissionRecord {
    fn from(submission: Submission) -> Self {
        let status = submission.status();
        let (reviewed_at, reviewed_by, rejection_note) = match submission.review {
            ReviewState::Pending => (None, None, None),
            ReviewState::Approved {
                reviewed_at,
                reviewed_by,
            } => (reviewed_at, reviewed_by.map(serde_json::Value::String), None),
            ReviewState::Rejected { reviewed_at, note } => (reviewed_at, None, Some(note)),
        };

        Self {
            id: submission.id,
            name: submission.name,
            slug: submission.slug,
            status,
            created_by: submission.created_by,
            created_at: submission.created_at,
            reviewed_at,
            reviewed_by,
            rejection_note,
        }
    }
}
