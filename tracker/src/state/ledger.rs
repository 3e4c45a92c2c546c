//! Caller-side view of the ledger.
//!
//! Holds the category and expense collections as last fetched, folds the
//! canonical entities returned by mutations back into them, and derives every
//! total from the current collections on each read.

use shared::{
    Category, CreateCategoryRequest, CreateExpenseRequest, Expense, ExpenseListQuery, Filter,
    MonthlyTotal, UpdateCategoryRequest, UpdateExpenseRequest, FALLBACK_CATEGORY_ID,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::backend::domain::models::category::default_categories;
use crate::backend::domain::reports;
use crate::client::{ApiResult, DispatchClient};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    pub categories: Vec<Category>,
    pub expenses: Vec<Expense>,
    pub loading: bool,
    pub error: Option<String>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload categories. On failure the error is recorded and, if nothing
    /// was loaded before, the default categories stand in.
    pub async fn fetch_categories(&mut self, client: &DispatchClient) {
        self.loading = true;
        self.error = None;

        match client.list_categories().await {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                warn!("Failed to load categories: {}", e.message);
                self.error = Some(e.message);
                if self.categories.is_empty() {
                    self.categories = default_categories();
                }
            }
        }
        self.loading = false;
    }

    pub async fn fetch_expenses(&mut self, client: &DispatchClient) {
        self.loading = true;
        self.error = None;

        match client.list_expenses(&ExpenseListQuery::default()).await {
            Ok(expenses) => self.expenses = expenses,
            Err(e) => {
                warn!("Failed to load expenses: {}", e.message);
                self.error = Some(e.message);
            }
        }
        self.loading = false;
    }

    pub async fn refresh(&mut self, client: &DispatchClient) {
        self.fetch_categories(client).await;
        let category_error = self.error.take();
        self.fetch_expenses(client).await;
        if self.error.is_none() {
            self.error = category_error;
        }
        info!(
            "Ledger refreshed: {} categories, {} expenses",
            self.categories.len(),
            self.expenses.len()
        );
    }

    pub async fn create_category(
        &mut self,
        client: &DispatchClient,
        request: &CreateCategoryRequest,
    ) -> ApiResult<Category> {
        let created = client.create_category(request).await?;
        self.apply_category_created(created.clone());
        Ok(created)
    }

    pub async fn update_category(
        &mut self,
        client: &DispatchClient,
        id: &str,
        request: &UpdateCategoryRequest,
    ) -> ApiResult<Category> {
        let updated = client.update_category(id, request).await?;
        self.apply_category_updated(updated.clone());
        Ok(updated)
    }

    pub async fn delete_category(&mut self, client: &DispatchClient, id: &str) -> ApiResult<()> {
        client.delete_category(id).await?;
        self.apply_category_deleted(id);
        Ok(())
    }

    pub async fn create_expense(
        &mut self,
        client: &DispatchClient,
        request: &CreateExpenseRequest,
    ) -> ApiResult<Expense> {
        let created = client.create_expense(request).await?;
        self.apply_expense_created(created.clone());
        Ok(created)
    }

    pub async fn update_expense(
        &mut self,
        client: &DispatchClient,
        id: &str,
        request: &UpdateExpenseRequest,
    ) -> ApiResult<Expense> {
        let updated = client.update_expense(id, request).await?;
        self.apply_expense_updated(updated.clone());
        Ok(updated)
    }

    pub async fn delete_expense(&mut self, client: &DispatchClient, id: &str) -> ApiResult<()> {
        client.delete_expense(id).await?;
        self.apply_expense_deleted(id);
        Ok(())
    }

    pub fn apply_category_created(&mut self, category: Category) {
        self.categories.push(category);
    }

    pub fn apply_category_updated(&mut self, category: Category) {
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == category.id) {
            *slot = category;
        }
    }

    /// Drop the category and move its expenses to the fallback category,
    /// mirroring the backend cascade
    pub fn apply_category_deleted(&mut self, id: &str) {
        self.categories.retain(|c| c.id != id);
        for expense in self.expenses.iter_mut().filter(|e| e.category_id == id) {
            expense.category_id = FALLBACK_CATEGORY_ID.to_string();
        }
    }

    pub fn apply_expense_created(&mut self, expense: Expense) {
        self.expenses.push(expense);
    }

    pub fn apply_expense_updated(&mut self, expense: Expense) {
        if let Some(slot) = self.expenses.iter_mut().find(|e| e.id == expense.id) {
            *slot = expense;
        }
    }

    pub fn apply_expense_deleted(&mut self, id: &str) {
        self.expenses.retain(|e| e.id != id);
    }

    pub fn category_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
            .unwrap_or(id)
    }

    // Selectors

    pub fn filtered(&self, filter: &Filter) -> Vec<&Expense> {
        reports::filter_expenses(&self.expenses, filter)
    }

    pub fn total(&self, filter: &Filter) -> f64 {
        reports::expenses_total(&self.expenses, filter)
    }

    pub fn count(&self, filter: &Filter) -> usize {
        reports::expenses_count(&self.expenses, filter)
    }

    pub fn monthly_totals(&self) -> Vec<MonthlyTotal> {
        reports::monthly_totals(&self.expenses)
    }

    pub fn by_category(&self) -> BTreeMap<String, f64> {
        reports::category_totals(&self.expenses)
    }
}
