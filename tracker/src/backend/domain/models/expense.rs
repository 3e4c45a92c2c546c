//! Domain rules for expenses: normalization, merge-on-update and validation.
use chrono::NaiveDate;
use serde_json::Value;
use shared::{CreateExpenseRequest, Expense, UpdateExpenseRequest, FALLBACK_CATEGORY_ID};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::domain::dates::{normalize_day, parse_day, format_day};
use crate::backend::domain::errors::ExpenseValidationError;

pub fn generate_id() -> String {
    format!("exp_{}", Uuid::new_v4().simple())
}

/// Coerce a loosely typed amount into a number.
///
/// Missing, null and empty-string amounts are 0. Numeric strings are parsed.
/// Anything else yields NaN, which validation rejects.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(_) => f64::NAN,
    }
}

/// Pick the category an expense is filed under.
///
/// Empty ids fall back to `current` (on update) or the fallback category; ids
/// that name no known category are coerced to the fallback.
fn resolve_category(
    requested: Option<&str>,
    current: Option<&str>,
    category_exists: &dyn Fn(&str) -> bool,
) -> String {
    match requested.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) if category_exists(id) => id.to_string(),
        Some(id) => {
            warn!("Unknown category '{}', filing expense under '{}'", id, FALLBACK_CATEGORY_ID);
            FALLBACK_CATEGORY_ID.to_string()
        }
        None => current.unwrap_or(FALLBACK_CATEGORY_ID).to_string(),
    }
}

pub fn validate(expense: &Expense) -> Result<(), ExpenseValidationError> {
    if expense.title.trim().is_empty() {
        return Err(ExpenseValidationError::TitleRequired);
    }
    if !expense.amount.is_finite() || expense.amount < 0.0 {
        return Err(ExpenseValidationError::InvalidAmount);
    }
    Ok(())
}

/// Normalize and validate a create request into a new expense with a fresh id
pub fn new_expense(
    request: &CreateExpenseRequest,
    category_exists: &dyn Fn(&str) -> bool,
    today: NaiveDate,
) -> Result<Expense, ExpenseValidationError> {
    let expense = Expense {
        id: generate_id(),
        title: request.title.as_deref().unwrap_or("").trim().to_string(),
        amount: coerce_amount(request.amount.as_ref()),
        category_id: resolve_category(request.category_id.as_deref(), None, category_exists),
        date: normalize_day(request.date.as_deref(), today),
        note: request.note.clone(),
    };

    validate(&expense)?;
    Ok(expense)
}

/// Merge `changes` onto `existing`, re-normalizing every touched field.
///
/// A supplied date that does not parse keeps the previous date.
pub fn apply_update(
    existing: &Expense,
    changes: &UpdateExpenseRequest,
    category_exists: &dyn Fn(&str) -> bool,
) -> Result<Expense, ExpenseValidationError> {
    let mut merged = existing.clone();

    if let Some(title) = &changes.title {
        merged.title = title.trim().to_string();
    }
    if let Some(amount) = &changes.amount {
        merged.amount = coerce_amount(Some(amount));
    }
    if let Some(date) = &changes.date {
        match parse_day(date) {
            Some(day) => merged.date = format_day(day),
            None => debug!("Ignoring unparseable date '{}' for expense {}", date, existing.id),
        }
    }
    if changes.category_id.is_some() {
        merged.category_id = resolve_category(
            changes.category_id.as_deref(),
            Some(existing.category_id.as_str()),
            category_exists,
        );
    }
    if let Some(note) = &changes.note {
        merged.note = Some(note.clone());
    }

    validate(&merged)?;
    Ok(merged)
}
