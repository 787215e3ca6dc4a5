// src/api/http.rs

//! HTTP client for the dashboard API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::api::{ReviewApi, ReviewDecision};
use crate::error::{AppError, Result};
use crate::models::{AdminStats, ApiConfig, Submission};

const STATS_PATH: &str = "api/country/dashboard/admin-stats";
const LIST_PATH: &str = "api/country/dashboard/all";
const REVIEW_PATH: &str = "api/country/dashboard/review/";
const DELETE_PATH: &str = "api/countries/";

#[derive(Debug, Deserialize)]
struct SubmissionsPage {
    #[serde(default)]
    submissions: Option<Vec<serde_json::Value>>,
}

impl SubmissionsPage {
    /// Decode each record on its own; malformed ones are logged and skipped.
    fn into_submissions(self) -> Vec<Submission> {
        self.submissions
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(submission) => Some(submission),
                Err(e) => {
                    log::warn!("Skipping submission #{} in listing: {}", index, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// reqwest-backed `ReviewApi`.
#[derive(Debug, Clone)]
pub struct HttpReviewApi {
    client: Client,
    base: Url,
}

impl HttpReviewApi {
    /// Create a client from the API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Endpoint with a percent-encoded id as the last segment.
    fn item_endpoint(&self, prefix: &str, id: &str) -> Result<Url> {
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("cannot use {} as API base", self.base)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> reqwest::Result<Response> {
        request.bearer_auth(token).send().await
    }
}

/// Pull `message` or `error` out of a JSON error body.
async fn server_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    body.message
        .or(body.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

/// Map a failed action response to `Unauthorized` or `ActionFailed`.
async fn action_error(response: Response, fallback: &str) -> AppError {
    if response.status() == StatusCode::UNAUTHORIZED {
        return AppError::Unauthorized;
    }
    let status = response.status();
    let message = server_message(response)
        .await
        .unwrap_or_else(|| format!("{fallback} ({status})"));
    AppError::action(message)
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn admin_stats(&self, token: &str) -> Result<AdminStats> {
        let url = self.endpoint(STATS_PATH)?;
        log::debug!("GET {}", url);

        let response = self
            .send(self.client.get(url), token)
            .await
            .map_err(AppError::stats)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized),
            status if status.is_success() => response.json().await.map_err(AppError::stats),
            status => Err(AppError::stats(format!("API returned {status}"))),
        }
    }

    async fn submissions(&self, token: &str, limit: usize) -> Result<Vec<Submission>> {
        let mut url = self.endpoint(LIST_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        log::debug!("GET {}", url);

        let response = self
            .send(self.client.get(url), token)
            .await
            .map_err(AppError::submissions)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized),
            status if status.is_success() => {
                let page: SubmissionsPage = response.json().await.map_err(AppError::submissions)?;
                Ok(page.into_submissions())
            }
            status => {
                let detail = server_message(response)
                    .await
                    .unwrap_or_else(|| format!("API returned {status}"));
                Err(AppError::submissions(detail))
            }
        }
    }

    async fn review(&self, token: &str, id: &str, decision: &ReviewDecision) -> Result<()> {
        let url = self.item_endpoint(REVIEW_PATH, id)?;
        log::debug!("PUT {} ({})", url, decision.status);

        let response = self
            .send(self.client.put(url).json(decision), token)
            .await
            .map_err(|e| AppError::action(format!("Failed to review submission: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(action_error(response, "Failed to review submission").await)
        }
    }

    async fn delete(&self, token: &str, id: &str) -> Result<()> {
        let url = self.item_endpoint(DELETE_PATH, id)?;
        log::debug!("DELETE {}", url);

        let response = self
            .send(self.client.delete(url), token)
            .await
            .map_err(|e| AppError::action(format!("Failed to delete submission: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(action_error(response, "Failed to delete submission").await)
        }
    }
}
