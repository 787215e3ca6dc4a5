// src/auth.rs

//! Bearer token resolution.
//!
//! The in-memory token wins; the persisted store is only consulted when no
//! token was supplied for this session.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Injected auth capability shared by the fetcher and the review controller.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl AuthContext {
    /// Context with an in-memory token only.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            store: None,
        }
    }

    /// Context that falls back to the persisted token.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            token: None,
            store: Some(store),
        }
    }

    /// Set or replace the in-memory token.
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Resolve the bearer token or fail with `Unauthorized`.
    ///
    /// Blank tokens count as absent.
    pub async fn resolve(&self) -> Result<String> {
        if let Some(token) = non_blank(self.token.as_deref()) {
            return Ok(token);
        }

        if let Some(store) = &self.store {
            match store.get(TOKEN_KEY).await {
                Ok(stored) => {
                    if let Some(token) = non_blank(stored.as_deref()) {
                        return Ok(token);
                    }
                }
                Err(e) => log::warn!("Could not read persisted token: {}", e),
            }
        }

        Err(AppError::Unauthorized)
    }

    /// Persist a token for later sessions.
    pub async fn login(&self, token: &str) -> Result<()> {
        let token = non_blank(Some(token)).ok_or_else(|| AppError::validation("token is empty"))?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AppError::config("no token store configured"))?;
        store.set(TOKEN_KEY, &token).await
    }

    /// Forget the persisted token.
    pub async fn logout(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.remove(TOKEN_KEY).await,
            None => Ok(()),
        }
    }
}

fn non_blank(token: Option<&str>) -> Option<String> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
