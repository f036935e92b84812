//! Monthly budget caps per category.
//!
//! `BudgetBook` keeps budgets in insertion order with an index keyed by the
//! normalized category name, so two budgets can never differ only by case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Preset categories and caps used when a user has no saved budgets.
pub const DEFAULT_BUDGETS: [(&str, f64); 7] = [
    ("Food", 15000.0),
    ("Transport", 5000.0),
    ("Bills", 10000.0),
    ("Shopping", 8000.0),
    ("Health", 5000.0),
    ("Entertainment", 4000.0),
    ("Other", 5000.0),
];

/// Fallback category for anything the parser cannot place.
pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub category: String,
    /// Monthly cap, never negative
    pub limit: f64,
}

impl Budget {
    pub fn new(category: impl Into<String>, limit: f64) -> Self {
        Self {
            category: category.into(),
            limit,
        }
    }
}

/// Key used for case-insensitive category lookups.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Budget>", into = "Vec<Budget>")]
pub struct BudgetBook {
    budgets: Vec<Budget>,
    // normalized category -> position in `budgets`
    idx: HashMap<String, usize>,
}

impl BudgetBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preset budget set.
    pub fn defaults() -> Self {
        DEFAULT_BUDGETS
            .iter()
            .map(|(c, l)| Budget::new(*c, *l))
            .collect::<Vec<_>>()
            .into()
    }

    pub fn len(&self) -> usize {
        self.budgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Budget> {
        self.budgets.iter()
    }

    pub fn as_slice(&self) -> &[Budget] {
        &self.budgets
    }

    /// Case-insensitive lookup.
    pub fn get(&self, category: &str) -> Option<&Budget> {
        self.idx
            .get(&normalize_category(category))
            .map(|&i| &self.budgets[i])
    }

    /// The cap for a category, or 0 when no budget exists for it.
    pub fn limit_for(&self, category: &str) -> f64 {
        self.get(category).map(|b| b.limit).unwrap_or(0.0)
    }

    /// Spelling of the matching budget's category, if any.
    pub fn canonical_name(&self, category: &str) -> Option<&str> {
        self.get(category).map(|b| b.category.as_str())
    }

    /// Replace the limit of a matching budget, or append a new one.
    ///
    /// An existing entry keeps its original spelling.
    pub fn upsert(&mut self, category: &str, limit: f64) -> &Budget {
        let key = normalize_category(category);
        let i = match self.idx.get(&key) {
            Some(&i) => {
                self.budgets[i].limit = limit;
                i
            }
            None => {
                self.budgets.push(Budget::new(category.trim(), limit));
                let i = self.budgets.len() - 1;
                self.idx.insert(key, i);
                i
            }
        };
        &self.budgets[i]
    }

    /// Remove the budget whose category is exactly `category`.
    pub fn remove_exact(&mut self, category: &str) -> Option<Budget> {
        let pos = self.budgets.iter().position(|b| b.category == category)?;
        let removed = self.budgets.remove(pos);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        self.idx = self
            .budgets
            .iter()
            .enumerate()
            .map(|(i, b)| (normalize_category(&b.category), i))
            .collect();
    }
}

impl From<Vec<Budget>> for BudgetBook {
    fn from(budgets: Vec<Budget>) -> Self {
        let mut book = BudgetBook::new();
        for b in budgets {
            book.upsert(&b.category, b.limit);
        }
        book
    }
}

impl From<BudgetBook> for Vec<Budget> {
    fn from(book: BudgetBook) -> Self {
        book.budgets
    }
}
