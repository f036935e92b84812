//! Parser output: decoding model text and validating it into a `NewExpense`.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use smartspend_core::time::parse_calendar_date;
use smartspend_core::{categorize, BudgetBook, NewExpense, FALLBACK_CATEGORY};

/// Fixed instructions sent to the language model with every utterance.
pub const PARSER_INSTRUCTIONS: &str = "You extract a single expense from a user's message.\n\
Reply with JSON only, no prose and no code fences, in exactly this shape:\n\
{\"amount\": number, \"category\": string, \"description\": string, \"date\": \"YYYY-MM-DD\"}\n\
Rules:\n\
- amount is a positive number without currency symbols or thousands separators.\n\
- category is one of: Food, Transport, Bills, Shopping, Health, Entertainment, Other. Use Other when unsure.\n\
- description is a short summary of what was bought.\n\
- Resolve relative dates (today, yesterday, last Friday) against the current date given in the message. Default to the current date.\n\
- If the message contains no amount, set amount to null.";

/// The user turn sent alongside [`PARSER_INSTRUCTIONS`].
pub fn parser_prompt(text: &str, today: NaiveDate) -> String {
    format!("Current date: {}\nMessage: {}", today.format("%Y-%m-%d"), text.trim())
}

/// Structured result of parsing one utterance. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedExpense {
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl ParsedExpense {
    pub fn new(amount: f64, category: &str, description: &str, date: &str) -> Self {
        Self {
            amount: Some(amount),
            category: Some(category.to_string()),
            description: Some(description.to_string()),
            date: Some(date.to_string()),
        }
    }

    /// Decode a model reply. Tolerates code fences and prose around the JSON
    /// object; an `amount` that is not a JSON number decodes as `None`.
    pub fn from_model_text(text: &str) -> Result<Self> {
        let start = text.find('{').context("no JSON object in model reply")?;
        let end = text.rfind('}').context("unterminated JSON object in model reply")?;
        if end < start {
            bail!("malformed JSON object in model reply");
        }

        let v: Value =
            serde_json::from_str(&text[start..=end]).context("parse model reply as JSON")?;
        let Value::Object(obj) = v else {
            bail!("model reply is not a JSON object");
        };

        let text_field = |k: &str| {
            obj.get(k)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            amount: obj.get("amount").and_then(Value::as_f64),
            category: text_field("category"),
            description: text_field("description"),
            date: text_field("date"),
        })
    }

    /// Validate into a saveable expense.
    ///
    /// Returns `None` when the amount is missing, not finite, or not
    /// positive. Category, description and date fall back to sensible
    /// defaults instead of failing.
    pub fn into_new_expense(
        self,
        utterance: &str,
        today: NaiveDate,
        budgets: &BudgetBook,
    ) -> Option<NewExpense> {
        let amount = self.amount.filter(|a| a.is_finite() && *a > 0.0)?;

        let description = self
            .description
            .unwrap_or_else(|| utterance.trim().to_string());

        let category = match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => categorize(&description).to_string(),
        };
        let category = budgets
            .canonical_name(&category)
            .map(str::to_string)
            .unwrap_or(category);
        let category = if category.is_empty() {
            FALLBACK_CATEGORY.to_string()
        } else {
            category
        };

        let date = self
            .date
            .as_deref()
            .and_then(parse_calendar_date)
            .unwrap_or(today);

        Some(NewExpense::new(amount, category, description, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_decode_plain_json() {
        let p = ParsedExpense::from_model_text(
            r#"{"amount": 250, "category": "Food", "description": "lunch", "date": "2026-10-17"}"#,
        )
        .unwrap();
        assert_eq!(p, ParsedExpense::new(250.0, "Food", "lunch", "2026-10-17"));
    }

    #[test]
    fn test_decode_fenced_json() {
        let reply = "Sure!\n```json\n{\"amount\": 12.5, \"category\": \"Transport\", \"description\": \"bus\", \"date\": \"2026-10-18\"}\n```";
        let p = ParsedExpense::from_model_text(reply).unwrap();
        assert_eq!(p.amount, Some(12.5));
        assert_eq!(p.category.as_deref(), Some("Transport"));
    }

    #[test]
    fn test_non_numeric_amount_is_none() {
        let p = ParsedExpense::from_model_text(r#"{"amount": "two hundred", "category": "Food"}"#)
            .unwrap();
        assert_eq!(p.amount, None);

        let p = ParsedExpense::from_model_text(r#"{"amount": null}"#).unwrap();
        assert_eq!(p.amount, None);
    }

    #[test]
    fn test_decode_failures() {
        assert!(ParsedExpense::from_model_text("I could not understand that").is_err());
        assert!(ParsedExpense::from_model_text("} oops {").is_err());
        assert!(ParsedExpense::from_model_text("{not json}").is_err());
    }

    #[test]
    fn test_rejects_missing_or_non_positive_amount() {
        let budgets = BudgetBook::defaults();
        let missing = ParsedExpense {
            amount: None,
            ..ParsedExpense::new(0.0, "Food", "x", "2026-10-18")
        };
        assert!(missing.into_new_expense("x", today(), &budgets).is_none());

        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let p = ParsedExpense::new(bad, "Food", "x", "2026-10-18");
            assert!(p.into_new_expense("x", today(), &budgets).is_none(), "{bad}");
        }
    }

    #[test]
    fn test_category_is_canonicalized() {
        let budgets = BudgetBook::defaults();
        let p = ParsedExpense::new(30.0, "  food ", "tea", "2026-10-18");
        let e = p.into_new_expense("tea 30", today(), &budgets).unwrap();
        assert_eq!(e.category, "Food");

        let p = ParsedExpense::new(30.0, "Pets", "kibble", "2026-10-18");
        let e = p.into_new_expense("kibble 30", today(), &budgets).unwrap();
        assert_eq!(e.category, "Pets");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let budgets = BudgetBook::defaults();
        let p = ParsedExpense {
            amount: Some(80.0),
            ..Default::default()
        };
        let e = p.into_new_expense("taxi home 80", today(), &budgets).unwrap();
        assert_eq!(e.description, "taxi home 80");
        assert_eq!(e.category, "Transport");
        assert_eq!(e.date, today());

        let p = ParsedExpense::new(5.0, "Other", "thing", "last week");
        let e = p.into_new_expense("thing 5", today(), &budgets).unwrap();
        assert_eq!(e.date, today());
    }

    #[test]
    fn test_prompt_carries_date() {
        let p = parser_prompt(" spent 20 ", today());
        assert_eq!(p, "Current date: 2026-10-18\nMessage: spent 20");
    }
}
