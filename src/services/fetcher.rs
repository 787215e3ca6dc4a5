// src/services/fetcher.rs

//! Dashboard data loading.

use std::sync::Arc;

use chrono::Local;

use crate::api::ReviewApi;
use crate::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::models::{AdminStats, StatsSnapshot, Submission};

/// Result of a full dashboard load.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub submissions: Vec<Submission>,
    pub stats: StatsSnapshot,
}

/// Loads stats and submissions. Never mutates shared state.
#[derive(Clone)]
pub struct DataFetcher {
    api: Arc<dyn ReviewApi>,
    auth: AuthContext,
}

impl DataFetcher {
    pub fn new(api: Arc<dyn ReviewApi>, auth: AuthContext) -> Self {
        Self { api, auth }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn api(&self) -> &Arc<dyn ReviewApi> {
        &self.api
    }

    /// Fetch server-side aggregate stats.
    ///
    /// Fails with `Unauthorized` or `StatsUnavailable`.
    pub async fn load_stats(&self) -> Result<AdminStats> {
        let token = self.auth.resolve().await?;
        self.api.admin_stats(&token).await.map_err(|e| match e {
            AppError::Unauthorized | AppError::StatsUnavailable(_) => e,
            other => AppError::stats(other),
        })
    }

    /// Fetch up to `limit` submissions.
    ///
    /// Fails with `Unauthorized` or `SubmissionsUnavailable`.
    pub async fn load_submissions(&self, limit: usize) -> Result<Vec<Submission>> {
        let token = self.auth.resolve().await?;
        self.api.submissions(&token, limit).await.map_err(|e| match e {
            AppError::Unauthorized | AppError::SubmissionsUnavailable(_) => e,
            other => AppError::submissions(other),
        })
    }

    /// Load stats and submissions concurrently.
    ///
    /// Unavailable stats are replaced by stats derived from the loaded list.
    pub async fn load_all(&self, limit: usize) -> Result<Dashboard> {
        // Resolve once so a missing token short-circuits both calls.
        self.auth.resolve().await?;

        let (stats, submissions) = futures::join!(self.load_stats(), self.load_submissions(limit));

        let submissions = match (&stats, submissions) {
            (Err(AppError::Unauthorized), _) => return Err(AppError::Unauthorized),
            (_, result) => result?,
        };

        let stats = match stats {
            Ok(stats) => StatsSnapshot::remote(stats),
            Err(e) => {
                log::warn!("{}; deriving stats from {} submissions", e, submissions.len());
                StatsSnapshot::derived(&submissions, &Local::now())
            }
        };

        log::info!("Loaded {} submissions", submissions.len());
        Ok(Dashboard { submissions, stats })
    }
}
