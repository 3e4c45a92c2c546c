//! Domain rules for categories.
use shared::{Category, CreateCategoryRequest, UpdateCategoryRequest, FALLBACK_CATEGORY_ID};
use uuid::Uuid;

use crate::backend::domain::errors::CategoryValidationError;

/// The set every fresh store is seeded with. The last entry is the fallback.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("food", "Food"),
        Category::new("transport", "Transport"),
        Category::new("rent", "Rent"),
        Category::new(FALLBACK_CATEGORY_ID, "Misc"),
    ]
}

pub fn fallback_category() -> Category {
    Category::new(FALLBACK_CATEGORY_ID, "Misc")
}

pub fn generate_id() -> String {
    format!("cat_{}", Uuid::new_v4().simple())
}

/// Build a new category with a fresh id from a create request
pub fn new_category(request: &CreateCategoryRequest) -> Result<Category, CategoryValidationError> {
    let name = request.name.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        return Err(CategoryValidationError::NameRequired);
    }
    Ok(Category::new(generate_id(), name))
}

/// Apply an update to `existing`. The id never changes.
pub fn apply_update(
    existing: &Category,
    changes: &UpdateCategoryRequest,
) -> Result<Category, CategoryValidationError> {
    let name = match changes.name.as_deref() {
        Some(name) => name.trim(),
        None => existing.name.as_str(),
    };
    if name.is_empty() {
        return Err(CategoryValidationError::EmptyName);
    }
    Ok(Category::new(existing.id.clone(), name))
}
