//! # Storage Traits
//!
//! This module defines the storage abstraction the repository is written
//! against, so the file-backed medium, the in-memory medium used for session
//! state, and the disabled medium can be used interchangeably.

use anyhow::Result;
use async_trait::async_trait;

/// A string key-value persistence medium.
///
/// Values are opaque strings; callers decide the encoding (JSON everywhere in
/// this crate). Every method may fail when the medium itself is unavailable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Short name for logs and health output
    fn describe(&self) -> String;
}
