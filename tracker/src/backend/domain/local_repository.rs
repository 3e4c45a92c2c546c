//! Local persistent repository.
//!
//! Sole owner of the canonical category and expense collections. State lives
//! in an injected [`KeyValueStore`] as three JSON records; every operation runs
//! its whole read-modify-write cycle under one async mutex, so no caller can
//! observe a half-applied mutation (the category cascade included).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{
    Category, CreateCategoryRequest, CreateExpenseRequest, DeleteResponse, Expense,
    ExpenseListQuery, HealthResponse, ReportSummary, ReportSummaryQuery, UpdateCategoryRequest,
    UpdateExpenseRequest, FALLBACK_CATEGORY_ID,
};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::storage::KeyValueStore;

use super::dates;
use super::errors::{CategoryValidationError, RepoError, RepoResult};
use super::models::{category, expense};
use super::reports;

pub const CATEGORIES_KEY: &str = "expenses.categories";
pub const EXPENSES_KEY: &str = "expenses.items";
pub const META_KEY: &str = "expenses.meta";

/// Seed bookkeeping stored under [`META_KEY`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeded_at: Option<String>,
}

#[derive(Clone)]
pub struct LocalRepository {
    store: Arc<dyn KeyValueStore>,
    lock: Arc<Mutex<()>>,
}

impl LocalRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Boot step: seed or load. Storage failures are logged, never raised, so
    /// an unavailable medium degrades to defaults instead of aborting startup.
    pub async fn init(&self) {
        match self.ensure_seed().await {
            Ok(true) => info!("Seeded local store ({})", self.store.describe()),
            Ok(false) => info!("Loaded existing local store ({})", self.store.describe()),
            Err(e) => warn!("Local store unavailable, continuing with defaults: {}", e),
        }
    }

    /// Populate missing collections. Returns whether anything was written.
    pub async fn ensure_seed(&self) -> RepoResult<bool> {
        let _guard = self.lock.lock().await;
        self.seed_locked().await
    }

    async fn seed_locked(&self) -> RepoResult<bool> {
        let mut changed = false;

        let categories: Option<Vec<Category>> = self.read_record(CATEGORIES_KEY).await?;
        if categories.map_or(true, |c| c.is_empty()) {
            self.write_record(CATEGORIES_KEY, &category::default_categories()).await?;
            changed = true;
        }

        let expenses: Option<Vec<Expense>> = self.read_record(EXPENSES_KEY).await?;
        if expenses.is_none() {
            self.write_record(EXPENSES_KEY, &Vec::<Expense>::new()).await?;
            changed = true;
        }

        if changed {
            let mut meta: SeedMetadata = self.read_record(META_KEY).await?.unwrap_or_default();
            if meta.seeded_at.is_none() {
                meta.seeded_at = Some(now_rfc3339());
                self.write_record(META_KEY, &meta).await?;
            }
        }

        Ok(changed)
    }

    /// Read and decode one record. A record that fails to decode is treated as absent.
    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> RepoResult<Option<T>> {
        let raw = self.store.get(key).await.map_err(RepoError::storage)?;
        match raw {
            None => Ok(None),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!("Discarding corrupt record '{}': {}", key, e);
                    Ok(None)
                }
            },
        }
    }

    async fn write_record<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> RepoResult<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| RepoError::StorageUnavailable(format!("encoding '{}': {}", key, e)))?;
        self.store.set(key, &encoded).await.map_err(RepoError::storage)
    }

    async fn categories_locked(&self) -> RepoResult<Vec<Category>> {
        self.seed_locked().await?;
        Ok(self
            .read_record(CATEGORIES_KEY)
            .await?
            .unwrap_or_else(category::default_categories))
    }

    async fn expenses_locked(&self) -> RepoResult<Vec<Expense>> {
        self.seed_locked().await?;
        Ok(self.read_record(EXPENSES_KEY).await?.unwrap_or_default())
    }

    pub async fn seed_metadata(&self) -> RepoResult<SeedMetadata> {
        let _guard = self.lock.lock().await;
        Ok(self.read_record(META_KEY).await?.unwrap_or_default())
    }

    /// All categories. Never fails: an unavailable medium yields the default set.
    pub async fn list_categories(&self) -> Vec<Category> {
        let _guard = self.lock.lock().await;
        match self.categories_locked().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!("Falling back to default categories: {}", e);
                category::default_categories()
            }
        }
    }

    pub async fn create_category(&self, request: CreateCategoryRequest) -> RepoResult<Category> {
        let created = category::new_category(&request)?;

        let _guard = self.lock.lock().await;
        let mut categories = self.categories_locked().await?;
        categories.push(created.clone());
        self.write_record(CATEGORIES_KEY, &categories).await?;

        info!("Created category {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_category(
        &self,
        id: &str,
        request: UpdateCategoryRequest,
    ) -> RepoResult<Category> {
        let _guard = self.lock.lock().await;
        let mut categories = self.categories_locked().await?;
        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RepoError::NotFound("Category not found".to_string()))?;

        let updated = category::apply_update(&categories[index], &request)?;
        categories[index] = updated.clone();
        self.write_record(CATEGORIES_KEY, &categories).await?;

        info!("Updated category {}", id);
        Ok(updated)
    }

    /// Delete a category and move every expense filed under it to the fallback
    /// category, in one locked step.
    pub async fn delete_category(&self, id: &str) -> RepoResult<DeleteResponse> {
        if id == FALLBACK_CATEGORY_ID {
            return Err(CategoryValidationError::FallbackNotDeletable.into());
        }

        let _guard = self.lock.lock().await;
        let mut categories = self.categories_locked().await?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(RepoError::NotFound("Category not found".to_string()));
        }
        if !categories.iter().any(|c| c.id == FALLBACK_CATEGORY_ID) {
            categories.push(category::fallback_category());
        }

        let mut expenses = self.expenses_locked().await?;
        let mut reassigned = 0usize;
        for expense in expenses.iter_mut().filter(|e| e.category_id == id) {
            expense.category_id = FALLBACK_CATEGORY_ID.to_string();
            reassigned += 1;
        }

        // Expenses first: a failure between the two writes must not leave
        // expenses pointing at a category that no longer exists.
        if reassigned > 0 {
            self.write_record(EXPENSES_KEY, &expenses).await?;
        }
        self.write_record(CATEGORIES_KEY, &categories).await?;

        info!("Deleted category {} ({} expenses moved to '{}')", id, reassigned, FALLBACK_CATEGORY_ID);
        Ok(DeleteResponse { deleted: true })
    }

    /// Expenses matching every supplied bound. Dates compare as strings, which
    /// is sound because stored dates are always `YYYY-MM-DD`.
    pub async fn list_expenses(&self, query: &ExpenseListQuery) -> RepoResult<Vec<Expense>> {
        let _guard = self.lock.lock().await;
        let expenses = self.expenses_locked().await?;
        Ok(filter_by_query(expenses, query))
    }

    pub async fn create_expense(&self, request: CreateExpenseRequest) -> RepoResult<Expense> {
        let _guard = self.lock.lock().await;
        let categories = self.categories_locked().await?;
        let exists = |id: &str| categories.iter().any(|c| c.id == id);
        let created = expense::new_expense(&request, &exists, dates::today())?;

        let mut expenses = self.expenses_locked().await?;
        expenses.push(created.clone());
        self.write_record(EXPENSES_KEY, &expenses).await?;

        debug!("Created expense {} for {:.2}", created.id, created.amount);
        Ok(created)
    }

    pub async fn update_expense(
        &self,
        id: &str,
        request: UpdateExpenseRequest,
    ) -> RepoResult<Expense> {
        let _guard = self.lock.lock().await;
        let mut expenses = self.expenses_locked().await?;
        let index = expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| RepoError::NotFound("Expense not found".to_string()))?;

        let categories = self.categories_locked().await?;
        let exists = |id: &str| categories.iter().any(|c| c.id == id);
        let updated = expense::apply_update(&expenses[index], &request, &exists)?;

        expenses[index] = updated.clone();
        self.write_record(EXPENSES_KEY, &expenses).await?;

        debug!("Updated expense {}", id);
        Ok(updated)
    }

    /// Remove an expense. Deleting an unknown id is not an error.
    pub async fn delete_expense(&self, id: &str) -> RepoResult<DeleteResponse> {
        let _guard = self.lock.lock().await;
        let mut expenses = self.expenses_locked().await?;
        let before = expenses.len();
        expenses.retain(|e| e.id != id);
        if expenses.len() != before {
            self.write_record(EXPENSES_KEY, &expenses).await?;
            debug!("Deleted expense {}", id);
        }
        Ok(DeleteResponse { deleted: true })
    }

    /// Report over the expenses within `[from, to]`
    pub async fn reports_summary(&self, query: &ReportSummaryQuery) -> RepoResult<ReportSummary> {
        let list_query = ExpenseListQuery {
            from: query.from.clone(),
            to: query.to.clone(),
            category_id: None,
        };
        let expenses = self.list_expenses(&list_query).await?;
        Ok(reports::summarize(&expenses))
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            mode: "local".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn filter_by_query(expenses: Vec<Expense>, query: &ExpenseListQuery) -> Vec<Expense> {
    let from = non_empty(&query.from);
    let to = non_empty(&query.to);
    let category_id = non_empty(&query.category_id);

    expenses
        .into_iter()
        .filter(|e| from.map_or(true, |from| e.date.as_str() >= from))
        .filter(|e| to.map_or(true, |to| e.date.as_str() <= to))
        .filter(|e| category_id.map_or(true, |id| e.category_id == id))
        .collect()
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| dates::format_day(dates::today()))
}
