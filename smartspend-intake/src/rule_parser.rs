//! Offline expense parser.
//!
//! Used when no language model is configured. Deterministic: the first number
//! in the message is the amount, keyword rules pick the category, and a small
//! set of relative-date words is understood.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use regex::Regex;

use smartspend_core::categorize;

use crate::collaborators::ExpenseParser;
use crate::parsed::ParsedExpense;

pub struct RuleParser {
    iso_date_re: Regex,
    amount_re: Regex,
}

impl RuleParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            iso_date_re: Regex::new(r"\b(?P<date>\d{4}-\d{2}-\d{2})\b")?,
            // 1,250.50 | 1250.5 | 2k
            amount_re: Regex::new(concat!(
                r"(?i)(?P<num>\d{1,3}(?:,\d{2,3})+(?:\.\d+)?|\d+(?:\.\d+)?)",
                r"\s*(?P<k>k\b)?"
            ))?,
        })
    }

    /// Parse synchronously; never fails, missing pieces stay `None`.
    pub fn parse_text(&self, text: &str, today: NaiveDate) -> ParsedExpense {
        let lower = text.to_lowercase();

        let iso = self
            .iso_date_re
            .captures(text)
            .and_then(|c| NaiveDate::parse_from_str(&c["date"], "%Y-%m-%d").ok());
        let date = iso.or_else(|| relative_date(&lower, today));

        // Dates would otherwise be read as amounts.
        let without_dates = self.iso_date_re.replace_all(text, " ");
        let amount = self.amount_re.captures(&without_dates).and_then(|c| {
            let n: f64 = c["num"].replace(',', "").parse().ok()?;
            Some(if c.name("k").is_some() { n * 1000.0 } else { n })
        });

        ParsedExpense {
            amount,
            category: Some(categorize(text).to_string()),
            description: Some(text.trim().to_string()).filter(|s| !s.is_empty()),
            date: date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn relative_date(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    if lower.contains("day before yesterday") {
        Some(today - Duration::days(2))
    } else if lower.contains("yesterday") {
        Some(today - Duration::days(1))
    } else if lower.contains("today") {
        Some(today)
    } else {
        None
    }
}

#[async_trait]
impl ExpenseParser for RuleParser {
    async fn parse(&self, text: &str, today: NaiveDate) -> Result<ParsedExpense> {
        Ok(self.parse_text(text, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_simple_amount_and_category() {
        let p = RuleParser::new().unwrap().parse_text("spent 250 on lunch", today());
        assert_eq!(p.amount, Some(250.0));
        assert_eq!(p.category.as_deref(), Some("Food"));
        assert_eq!(p.description.as_deref(), Some("spent 250 on lunch"));
        assert_eq!(p.date, None);
    }

    #[test]
    fn test_thousands_and_k_suffix() {
        let parser = RuleParser::new().unwrap();
        assert_eq!(parser.parse_text("rent 12,500", today()).amount, Some(12500.0));
        assert_eq!(parser.parse_text("paid 1,250.75 electricity bill", today()).amount, Some(1250.75));
        assert_eq!(parser.parse_text("new shoes 2k", today()).amount, Some(2000.0));
        assert_eq!(parser.parse_text("tip 50 kindly", today()).amount, Some(50.0));
    }

    #[test]
    fn test_relative_dates() {
        let parser = RuleParser::new().unwrap();
        let p = parser.parse_text("uber 180 yesterday", today());
        assert_eq!(p.date.as_deref(), Some("2026-10-17"));
        assert_eq!(p.category.as_deref(), Some("Transport"));

        let p = parser.parse_text("movie 300 day before yesterday", today());
        assert_eq!(p.date.as_deref(), Some("2026-10-16"));
    }

    #[test]
    fn test_iso_date_is_not_amount() {
        let p = RuleParser::new()
            .unwrap()
            .parse_text("2026-10-01 pharmacy 420", today());
        assert_eq!(p.amount, Some(420.0));
        assert_eq!(p.date.as_deref(), Some("2026-10-01"));
        assert_eq!(p.category.as_deref(), Some("Health"));
    }

    #[test]
    fn test_no_amount() {
        let p = RuleParser::new().unwrap().parse_text("bought coffee", today());
        assert_eq!(p.amount, None);
    }

    #[tokio::test]
    async fn test_trait_impl() {
        let parser = RuleParser::new().unwrap();
        let p = parser.parse("tea 20 today", today()).await.unwrap();
        assert_eq!(p.amount, Some(20.0));
        assert_eq!(p.date.as_deref(), Some("2026-10-18"));
    }
}
