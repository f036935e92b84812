//! smartspend-core: expense, budget and chat types plus pure budget math.

pub mod aggregator;
pub mod budget;
pub mod chat;
pub mod expense;
pub mod palette;
pub mod time;

pub use aggregator::{
    budget_left_after, category_breakdown, display_remaining, month_summary, monthly_spend,
    remaining_budget, total_spend, trend, CategorySpend, DateRange, MonthSummary, TrendPoint,
    MAX_TREND_MONTHS,
};
pub use budget::{normalize_category, Budget, BudgetBook, DEFAULT_BUDGETS, FALLBACK_CATEGORY};
pub use chat::{ChatMessage, ChatMeta, Role};
pub use expense::{Expense, NewExpense};
pub use palette::{color_for, PALETTE};

/// Keyword rules that place a description into one of the preset categories.
pub mod categorizer {
    use crate::budget::FALLBACK_CATEGORY;

    const RULES: &[(&str, &[&str])] = &[
        (
            "Food",
            &[
                "food", "lunch", "dinner", "breakfast", "grocery", "groceries", "restaurant", "cafe", "coffee",
                "tea", "snack", "snacks", "pizza", "swiggy", "zomato", "doordash", "uber eats",
            ],
        ),
        (
            "Transport",
            &[
                "uber", "ola", "taxi", "cab", "bus", "metro", "train", "fuel", "petrol", "diesel",
                "parking", "toll", "auto",
            ],
        ),
        (
            "Bills",
            &[
                "bill", "bills", "rent", "electricity", "water", "internet", "wifi", "phone", "recharge",
                "gas bill", "insurance", "emi",
            ],
        ),
        (
            "Shopping",
            &[
                "shopping", "amazon", "flipkart", "clothes", "shoes", "shirt", "shirts", "dress", "mall",
                "gadget",
            ],
        ),
        (
            "Health",
            &[
                "doctor", "medicine", "medicines", "pharmacy", "hospital", "clinic", "dentist", "gym",
                "health",
            ],
        ),
        (
            "Entertainment",
            &[
                "movie", "movies", "cinema", "netflix", "spotify", "concert", "game", "party", "show",
                "subscription",
            ],
        ),
    ];

    /// Categorize a description, falling back to "Other".
    ///
    /// Rules are checked in order; the "Food" rules run before "Transport" so
    /// "uber eats" lands in Food.
    pub fn categorize(description: &str) -> &'static str {
        let desc = description.to_lowercase();
        RULES
            .iter()
            .find(|(_, words)| words.iter().any(|w| contains_word(&desc, w)))
            .map(|(category, _)| *category)
            .unwrap_or(FALLBACK_CATEGORY)
    }

    // Whole-word match so "tea" does not fire on "steak" or "auto" on "automatic".
    fn contains_word(haystack: &str, needle: &str) -> bool {
        haystack.match_indices(needle).any(|(i, _)| {
            let before = haystack[..i].chars().next_back();
            let after = haystack[i + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_categorize_food() {
            assert_eq!(categorize("Lunch with team"), "Food");
            assert_eq!(categorize("uber eats order"), "Food");
        }

        #[test]
        fn test_categorize_transport() {
            assert_eq!(categorize("Uber to airport"), "Transport");
            assert_eq!(categorize("metro card top-up"), "Transport");
        }

        #[test]
        fn test_categorize_bills() {
            assert_eq!(categorize("Electricity bill"), "Bills");
        }

        #[test]
        fn test_word_boundaries() {
            assert_eq!(categorize("steak"), "Other");
            assert_eq!(categorize("automatic pencil"), "Other");
        }

        #[test]
        fn test_categorize_fallback() {
            assert_eq!(categorize("gift for a friend"), "Other");
            assert_eq!(categorize(""), "Other");
        }
    }
}

pub use categorizer::categorize;
