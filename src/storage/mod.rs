//! Persisted key/value storage for session data.
//!
//! Plays the part of the browser's local storage: the only thing the desk
//! keeps between runs is the auth token under [`TOKEN_KEY`].
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Desk configuration
//! └── session.json          # { "countryToken": "..." }
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;

pub use local::{LocalStore, MemoryStore};

/// Key under which the auth token is persisted.
pub const TOKEN_KEY: &str = "countryToken";

/// Trait for persisted key/value backends.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
