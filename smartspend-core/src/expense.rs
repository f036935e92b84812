//! Expense records logged through the chat intake.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::budget::normalize_category;

/// A saved expense. Immutable once persistence has assigned its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    /// Identifier assigned by the persistence backend
    pub id: String,
    /// Amount spent, always positive
    pub amount: f64,
    /// Free-form category label (usually one of the budget categories)
    pub category: String,
    /// Human-readable description
    pub description: String,
    /// Calendar date of the expense (YYYY-MM-DD)
    pub date: NaiveDate,
}

/// An expense that has been parsed and validated but not yet saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

impl NewExpense {
    pub fn new(
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            category: category.into(),
            description: description.into(),
            date,
        }
    }

    /// Attach the id handed back by persistence.
    pub fn into_expense(self, id: impl Into<String>) -> Expense {
        Expense {
            id: id.into(),
            amount: self.amount,
            category: self.category,
            description: self.description,
            date: self.date,
        }
    }
}

impl Expense {
    /// True when the expense falls in the given calendar month.
    pub fn in_month(&self, month: u32, year: i32) -> bool {
        self.date.month() == month && self.date.year() == year
    }

    /// Category match under the same folding budgets use for lookup.
    pub fn is_category(&self, category: &str) -> bool {
        normalize_category(&self.category) == normalize_category(category)
    }
}
