//! Aggregation engine.
//!
//! Pure functions over a slice of expenses. Nothing here owns or caches
//! state: every report is recomputed from the collection it is handed, so a
//! derived view can never lag behind a mutation.

use shared::{Expense, Filter, MonthlyTotal, ReportSummary};
use std::collections::BTreeMap;

use super::dates::month_key;

/// Amount contribution of one expense; non-finite amounts count as zero
fn amount_of(expense: &Expense) -> f64 {
    if expense.amount.is_finite() {
        expense.amount
    } else {
        0.0
    }
}

/// Totals per `YYYY-MM`, ascending. Expenses whose date does not parse are skipped.
pub fn monthly_totals(expenses: &[Expense]) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        if let Some(month) = month_key(&expense.date) {
            *by_month.entry(month).or_insert(0.0) += amount_of(expense);
        }
    }

    by_month
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// Totals per category id. Ids are kept verbatim, known or not.
pub fn category_totals(expenses: &[Expense]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category_id.clone()).or_insert(0.0) += amount_of(expense);
    }
    totals
}

pub fn summarize(expenses: &[Expense]) -> ReportSummary {
    ReportSummary {
        monthly: monthly_totals(expenses),
        by_category: category_totals(expenses),
    }
}

/// Whether `expense` satisfies every condition set on `filter`
pub fn matches_filter(expense: &Expense, filter: &Filter) -> bool {
    let query = filter.query.to_lowercase();
    if !query.is_empty() {
        let in_title = expense.title.to_lowercase().contains(&query);
        let in_note = expense
            .note
            .as_deref()
            .map(|note| note.to_lowercase().contains(&query))
            .unwrap_or(false);
        if !in_title && !in_note {
            return false;
        }
    }

    if let Some(min) = filter.min {
        if expense.amount < min {
            return false;
        }
    }
    if let Some(max) = filter.max {
        if expense.amount > max {
            return false;
        }
    }

    match filter.date.as_deref() {
        Some(date) if !date.is_empty() => expense.date == date,
        _ => true,
    }
}

pub fn filter_expenses<'a>(expenses: &'a [Expense], filter: &Filter) -> Vec<&'a Expense> {
    expenses
        .iter()
        .filter(|expense| matches_filter(expense, filter))
        .collect()
}

/// Sum of amounts over the filtered view
pub fn expenses_total(expenses: &[Expense], filter: &Filter) -> f64 {
    filter_expenses(expenses, filter)
        .into_iter()
        .map(amount_of)
        .sum()
}

/// Number of expenses in the filtered view
pub fn expenses_count(expenses: &[Expense], filter: &Filter) -> usize {
    filter_expenses(expenses, filter).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(id: &str, title: &str, amount: f64, category: &str, date: &str) -> Expense {
        Expense {
            id: id.to_string(),
            title: title.to_string(),
            amount,
            category_id: category.to_string(),
            date: date.to_string(),
            note: None,
        }
    }

    fn sample() -> Vec<Expense> {
        vec![
            expense("1", "Coffee", 3.5, "food", "2024-01-05"),
            expense("2", "Train pass", 60.0, "transport", "2024-02-01"),
            expense("3", "Groceries", 41.25, "food", "2024-01-20"),
            expense("4", "Lamp", 19.0, "cat_unknown", "2023-12-24"),
        ]
    }

    #[test]
    fn test_monthly_totals_sorted_ascending() {
        let monthly = monthly_totals(&sample());
        let months: Vec<&str> = monthly.iter().map(|m| m.month.as_str()).collect();

        assert_eq!(months, vec!["2023-12", "2024-01", "2024-02"]);
        assert_eq!(monthly[1].total, 44.75);
    }

    #[test]
    fn test_monthly_totals_skip_unparseable_dates() {
        let mut expenses = sample();
        expenses.push(expense("5", "Mystery", 100.0, "misc", "someday"));

        let total: f64 = monthly_totals(&expenses).iter().map(|m| m.total).sum();
        assert_eq!(total, 123.75);
    }

    #[test]
    fn test_category_totals_keep_unknown_ids() {
        let totals = category_totals(&sample());

        assert_eq!(totals.get("food"), Some(&44.75));
        assert_eq!(totals.get("cat_unknown"), Some(&19.0));
        assert_eq!(totals.len(), 3);
    }

    #[test]
    fn test_non_finite_amount_counts_as_zero() {
        let expenses = vec![expense("1", "Broken", f64::NAN, "food", "2024-01-01")];
        assert_eq!(category_totals(&expenses).get("food"), Some(&0.0));
        assert_eq!(monthly_totals(&expenses)[0].total, 0.0);
    }

    #[test]
    fn test_min_filter_scenario() {
        let expenses = vec![
            expense("a", "Small", 3.0, "misc", "2024-01-01"),
            expense("b", "Large", 10.0, "misc", "2024-01-01"),
        ];
        let filter = Filter {
            min: Some(5.0),
            ..Default::default()
        };

        let view = filter_expenses(&expenses, &filter);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "b");
        assert_eq!(expenses_total(&expenses, &filter), 10.0);
        assert_eq!(expenses_count(&expenses, &filter), 1);
    }

    #[test]
    fn test_query_matches_title_or_note_case_insensitively() {
        let mut expenses = sample();
        expenses[3].note = Some("Bedroom LIGHT".to_string());

        let by_title = Filter {
            query: "COF".to_string(),
            ..Default::default()
        };
        let by_note = Filter {
            query: "light".to_string(),
            ..Default::default()
        };

        assert_eq!(filter_expenses(&expenses, &by_title)[0].id, "1");
        assert_eq!(filter_expenses(&expenses, &by_note)[0].id, "4");
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let filter = Filter {
            query: "o".to_string(),
            min: Some(3.0),
            max: Some(50.0),
            date: Some("2024-01-20".to_string()),
        };
        let expenses = sample();
        let view = filter_expenses(&expenses, &filter);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "3");
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = Filter {
            date: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(expenses_count(&sample(), &filter), 4);
    }

    #[test]
    fn test_unfiltered_total_equals_sum_of_monthly_totals() {
        let expenses = sample();
        let monthly_sum: f64 = monthly_totals(&expenses).iter().map(|m| m.total).sum();
        assert_eq!(expenses_total(&expenses, &Filter::default()), monthly_sum);
    }

    #[test]
    fn test_summary_scenario() {
        let expenses = vec![expense("1", "Coffee", 3.5, "food", "2024-01-05")];
        let summary = summarize(&expenses);

        assert_eq!(
            summary.monthly,
            vec![MonthlyTotal {
                month: "2024-01".to_string(),
                total: 3.5
            }]
        );
        assert_eq!(summary.by_category.get("food"), Some(&3.5));
        assert_eq!(summary.by_category.len(), 1);
    }
}
