//! Budget aggregation: pure functions over the expense list.
//!
//! Nothing here touches state or the clock; callers pass `today` in.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::budget::{normalize_category, BudgetBook};
use crate::expense::{Expense, NewExpense};
use crate::palette::color_for;
use crate::time::{month_bounds, month_of, shift_month};

/// Optional inclusive date filter. Both bounds absent means "current month".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// The whole of a calendar month.
    pub fn month(year: i32, month: u32) -> Self {
        match month_bounds(year, month) {
            Some((first, last)) => Self::new(Some(first), Some(last)),
            None => Self::default(),
        }
    }

    /// Effective bounds, filling in the current month when unbounded.
    pub fn bounds(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match (self.start, self.end) {
            (None, None) => {
                let (first, last) = month_of(today);
                (Some(first), Some(last))
            }
            bounds => bounds,
        }
    }

    /// Inclusive on both ends; `end` covers the whole of that day.
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let (start, end) = self.bounds(today);
        start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Short month name, e.g. "Mar"
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub spent: f64,
    /// Budget cap for the category, 0 when unbudgeted
    pub limit: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub spent: f64,
    pub budgeted: f64,
    /// Signed; negative when total spend exceeds the total of all caps
    pub remaining: f64,
    /// Categories whose month spend exceeds their cap
    pub over_budget: Vec<String>,
}

/// Sum of expenses in `category` dated within `month`/`year`.
pub fn monthly_spend(expenses: &[Expense], category: &str, month: u32, year: i32) -> f64 {
    expenses
        .iter()
        .filter(|e| e.is_category(category) && e.in_month(month, year))
        .fold(0.0, |acc, e| acc + e.amount)
}

/// `limit - spent`, negative when over budget.
pub fn remaining_budget(limit: f64, spent: f64) -> f64 {
    limit - spent
}

/// Remaining budget clamped at zero for display.
pub fn display_remaining(limit: f64, spent: f64) -> f64 {
    remaining_budget(limit, spent).max(0.0)
}

/// Remaining budget in the new expense's category once it is added.
///
/// `expenses` must not contain `new` yet.
pub fn budget_left_after(expenses: &[Expense], budgets: &BudgetBook, new: &NewExpense) -> f64 {
    let prior = monthly_spend(
        expenses,
        &new.category,
        new.date.month(),
        new.date.year(),
    );
    remaining_budget(budgets.limit_for(&new.category), prior + new.amount)
}

/// Longest history [`trend`] will produce.
pub const MAX_TREND_MONTHS: usize = 120;

/// Total spend per month, oldest first, ending with `today`'s month.
///
/// `months_back` is capped at [`MAX_TREND_MONTHS`].
pub fn trend(expenses: &[Expense], months_back: usize, today: NaiveDate) -> Vec<TrendPoint> {
    let months = i32::try_from(months_back.min(MAX_TREND_MONTHS)).unwrap_or(0);
    (0..months)
        .rev()
        .map(|ago| {
            let (year, month) = shift_month(today.year(), today.month(), -ago);
            let total = expenses
                .iter()
                .filter(|e| e.in_month(month, year))
                .fold(0.0, |acc, e| acc + e.amount);
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
            TrendPoint {
                label,
                year,
                month,
                total,
            }
        })
        .collect()
}

/// Sum of all expenses within `range`.
pub fn total_spend(expenses: &[Expense], range: &DateRange, today: NaiveDate) -> f64 {
    expenses
        .iter()
        .filter(|e| range.contains(e.date, today))
        .fold(0.0, |acc, e| acc + e.amount)
}

/// Spend per category within `range`.
///
/// Covers every budget category plus any category seen in the filtered
/// expenses; categories with nothing spent are dropped.
pub fn category_breakdown(
    expenses: &[Expense],
    budgets: &BudgetBook,
    range: &DateRange,
    today: NaiveDate,
) -> Vec<CategorySpend> {
    let mut rows: Vec<CategorySpend> = budgets
        .iter()
        .map(|b| CategorySpend {
            category: b.category.clone(),
            spent: 0.0,
            limit: b.limit,
            color: color_for(&b.category),
        })
        .collect();
    let mut idx: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (normalize_category(&r.category), i))
        .collect();

    for e in expenses.iter().filter(|e| range.contains(e.date, today)) {
        let key = normalize_category(&e.category);
        let i = *idx.entry(key).or_insert_with(|| {
            rows.push(CategorySpend {
                category: e.category.trim().to_string(),
                spent: 0.0,
                limit: 0.0,
                color: color_for(&e.category),
            });
            rows.len() - 1
        });
        rows[i].spent += e.amount;
    }

    rows.retain(|r| r.spent > 0.0);
    rows
}

/// Dashboard totals for the month containing `today`.
pub fn month_summary(expenses: &[Expense], budgets: &BudgetBook, today: NaiveDate) -> MonthSummary {
    let range = DateRange::month(today.year(), today.month());
    let spent = total_spend(expenses, &range, today);
    let budgeted = budgets.iter().fold(0.0, |acc, b| acc + b.limit);
    let over_budget = budgets
        .iter()
        .filter(|b| {
            let s = monthly_spend(expenses, &b.category, today.month(), today.year());
            remaining_budget(b.limit, s) < 0.0
        })
        .map(|b| b.category.clone())
        .collect();

    MonthSummary {
        spent,
        budgeted,
        remaining: remaining_budget(budgeted, spent),
        over_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Budget;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn exp(id: &str, amount: f64, category: &str, date: NaiveDate) -> Expense {
        NewExpense::new(amount, category, id, date).into_expense(id)
    }

    fn sample() -> Vec<Expense> {
        vec![
            exp("a", 100.0, "Food", d(2026, 3, 1)),
            exp("b", 250.0, "food", d(2026, 3, 31)),
            exp("c", 40.0, "Transport", d(2026, 3, 15)),
            exp("d", 999.0, "Food", d(2026, 2, 28)),
            exp("e", 77.0, "Food", d(2025, 3, 10)),
            exp("f", 60.0, "Pets", d(2026, 3, 2)),
        ]
    }

    #[test]
    fn test_monthly_spend_filters_category_and_month() {
        let ex = sample();
        assert_eq!(monthly_spend(&ex, "Food", 3, 2026), 350.0);
        assert_eq!(monthly_spend(&ex, "Food", 2, 2026), 999.0);
        assert_eq!(monthly_spend(&ex, "Food", 3, 2025), 77.0);
        assert_eq!(monthly_spend(&ex, "Transport", 3, 2026), 40.0);
        assert_eq!(monthly_spend(&ex, "Bills", 3, 2026), 0.0);
        assert_eq!(monthly_spend(&[], "Food", 3, 2026), 0.0);
    }

    #[test]
    fn test_remaining_budget_is_signed() {
        assert_eq!(remaining_budget(1000.0, 400.0), 600.0);
        assert_eq!(remaining_budget(1000.0, 1500.0), -500.0);
        assert_eq!(display_remaining(1000.0, 1500.0), 0.0);
        assert_eq!(display_remaining(1000.0, 400.0), 600.0);
    }

    #[test]
    fn test_budget_left_after_new_expense() {
        let today = d(2026, 10, 18);
        let budgets: BudgetBook = vec![Budget::new("Food", 15000.0)].into();
        let prior = vec![
            exp("a", 7000.0, "Food", d(2026, 10, 2)),
            exp("b", 5000.0, "Food", d(2026, 10, 9)),
        ];
        let new = NewExpense::new(2000.0, "Food", "groceries", today);
        assert_eq!(budget_left_after(&prior, &budgets, &new), 1000.0);
    }

    #[test]
    fn test_budget_left_without_budget_is_negative() {
        let budgets = BudgetBook::new();
        let new = NewExpense::new(30.0, "Pets", "food", d(2026, 3, 3));
        assert_eq!(budget_left_after(&[], &budgets, &new), -30.0);
    }

    #[test]
    fn test_trend_spans_months_inclusive() {
        let ex = sample();
        let points = trend(&ex, 5, d(2026, 3, 20));
        assert_eq!(points.len(), 5);
        let labels: Vec<_> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Nov", "Dec", "Jan", "Feb", "Mar"]);
        assert_eq!(points[0].year, 2025);
        assert_eq!(points[3].total, 999.0);
        assert_eq!(points[4].total, 450.0);
        assert_eq!(points[1].total, 0.0);
    }

    #[test]
    fn test_trend_zero_months() {
        assert!(trend(&sample(), 0, d(2026, 3, 20)).is_empty());
    }

    #[test]
    fn test_breakdown_defaults_to_current_month() {
        let ex = sample();
        let budgets = BudgetBook::defaults();
        let rows = category_breakdown(&ex, &budgets, &DateRange::default(), d(2026, 3, 20));
        let cats: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(cats, vec!["Food", "Transport", "Pets"]);
        assert_eq!(rows[0].spent, 350.0);
        assert_eq!(rows[0].limit, 15000.0);
        assert_eq!(rows[2].limit, 0.0);
        assert_eq!(rows[2].color, crate::palette::DEFAULT_COLOR);
    }

    #[test]
    fn test_breakdown_without_budgets() {
        let ex = sample();
        let range = DateRange::new(Some(d(2025, 1, 1)), Some(d(2026, 12, 31)));
        let rows = category_breakdown(&ex, &BudgetBook::new(), &range, d(2026, 3, 20));
        assert_eq!(rows.len(), 3);
        let food = rows.iter().find(|r| r.category == "Food").unwrap();
        assert_eq!(food.spent, 100.0 + 250.0 + 999.0 + 77.0);
    }

    #[test]
    fn test_range_end_is_inclusive() {
        let ex = sample();
        let range = DateRange::new(Some(d(2026, 3, 15)), Some(d(2026, 3, 31)));
        assert_eq!(total_spend(&ex, &range, d(2026, 3, 20)), 290.0);

        let open_start = DateRange::new(None, Some(d(2026, 2, 28)));
        assert_eq!(total_spend(&ex, &open_start, d(2026, 3, 20)), 999.0 + 77.0);
    }

    #[test]
    fn test_month_summary_flags_overspend() {
        let budgets: BudgetBook =
            vec![Budget::new("Food", 300.0), Budget::new("Transport", 100.0)].into();
        let s = month_summary(&sample(), &budgets, d(2026, 3, 20));
        assert_eq!(s.spent, 450.0);
        assert_eq!(s.budgeted, 400.0);
        assert_eq!(s.remaining, -50.0);
        assert_eq!(s.over_budget, vec!["Food".to_string()]);
    }

    #[test]
    fn test_non_ascii_category_matches_budget() {
        let budgets: BudgetBook = vec![Budget::new("CAFÉ", 500.0)].into();
        let prior = vec![exp("a", 400.0, "café", d(2026, 3, 3))];
        assert_eq!(monthly_spend(&prior, "CAFÉ", 3, 2026), 400.0);

        let new = NewExpense::new(200.0, "CAFÉ", "latte", d(2026, 3, 9));
        assert_eq!(budget_left_after(&prior, &budgets, &new), -100.0);

        let mut all = prior.clone();
        all.push(exp("b", 200.0, "Café", d(2026, 3, 9)));
        let s = month_summary(&all, &budgets, d(2026, 3, 20));
        assert_eq!(s.over_budget, vec!["CAFÉ".to_string()]);
    }

    #[test]
    fn test_empty_sums_are_positive_zero() {
        let today = d(2026, 3, 20);
        let spent = monthly_spend(&[], "Food", 3, 2026);
        assert!(spent.is_sign_positive());
        assert_eq!(format!("{spent:.2}"), "0.00");

        let points = trend(&[], 2, today);
        assert!(points.iter().all(|p| p.total.is_sign_positive()));

        let total = total_spend(&[], &DateRange::default(), today);
        assert_eq!(format!("{total:.2}"), "0.00");

        let s = month_summary(&[], &BudgetBook::new(), today);
        assert!(s.budgeted.is_sign_positive());
    }

    #[test]
    fn test_trend_length_is_capped() {
        let today = d(2026, 3, 20);
        assert_eq!(trend(&[], usize::MAX, today).len(), MAX_TREND_MONTHS);
        assert_eq!(trend(&[], 2_000_000_000, today).len(), MAX_TREND_MONTHS);
        let last = trend(&[], MAX_TREND_MONTHS, today).pop().unwrap();
        assert_eq!((last.year, last.month), (2026, 3));
    }
}
