use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::KeyValueStore;

/// In-memory store. Lives as long as the process, which makes it the session
/// scope for the persisted filter query.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// A medium that refuses every operation, like a browser with storage
/// disabled. Used to exercise the degraded paths.
#[derive(Clone, Default)]
pub struct DisabledStore;

#[async_trait]
impl KeyValueStore for DisabledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage is disabled"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage is disabled"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(anyhow!("storage is disabled"))
    }

    fn describe(&self) -> String {
        "disabled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("q", "coffee").await.unwrap();

        assert_eq!(other.get("q").await.unwrap(), Some("coffee".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_store_fails_everything() {
        let store = DisabledStore;
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", "v").await.is_err());
        assert!(store.remove("k").await.is_err());
    }
}
