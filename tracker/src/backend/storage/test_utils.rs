/// Test utilities module for automatic cleanup and consistent test infrastructure
///
/// This module provides RAII-based cleanup that guarantees test data is removed
/// even if tests panic or fail.
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use anyhow::Result;

use super::file_store::FileStore;
use super::traits::KeyValueStore;
use crate::backend::domain::LocalRepository;

/// RAII Test Environment that automatically cleans up on drop
///
/// The temporary directory is removed when the TestEnvironment goes out of scope.
pub struct TestEnvironment {
    /// The temporary directory - kept alive to prevent auto-cleanup until drop
    _temp_dir: TempDir,
    /// The file store for the test
    pub store: FileStore,
    /// Base directory path for manual inspection if needed
    pub base_path: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment with automatic cleanup
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        let store = FileStore::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            store,
            base_path,
        })
    }

    /// Shared handle to the store, as the repository expects it
    pub fn store_handle(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(self.store.clone())
    }

    /// A seeded repository over this environment's store
    pub async fn repository(&self) -> LocalRepository {
        let repository = LocalRepository::new(self.store_handle());
        repository.init().await;
        repository
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if std::env::var("EXPENSE_TRACKER_DEBUG_TESTS").is_ok() {
            println!("Cleaning up test environment: {:?}", self.base_path);
        }
    }
}
