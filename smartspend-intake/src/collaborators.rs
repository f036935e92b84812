//! # Collaborator traits
//!
//! The store and pipeline never reach for a global client. Persistence, the
//! natural-language parser and the auth session are handed in at
//! construction time so tests can substitute doubles.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use smartspend_core::{Budget, ChatMessage, Expense, NewExpense};

use crate::parsed::ParsedExpense;

/// Everything persisted for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}

/// Durable store for a user's expenses, budgets and chat log.
///
/// Every call is keyed by the authenticated user id. Implementations report
/// a dead session by returning [`crate::error::SessionExpired`].
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Load all of a user's data.
    async fn fetch_all(&self, user_id: &str) -> Result<StoredState>;

    /// Save a new expense and return the canonical record with its id.
    async fn insert_expense(&self, user_id: &str, expense: &NewExpense) -> Result<Expense>;

    /// Insert or replace budgets, matched by category.
    async fn upsert_budgets(&self, user_id: &str, budgets: &[Budget]) -> Result<()>;

    /// Delete the budget whose category equals `category`.
    async fn delete_budget(&self, user_id: &str, category: &str) -> Result<()>;

    /// Append one message to the chat log.
    async fn append_chat(&self, user_id: &str, message: &ChatMessage) -> Result<()>;

    /// Delete every expense, budget and chat message of the user.
    async fn delete_all(&self, user_id: &str) -> Result<()>;
}

/// Turns a free-text utterance into a structured expense.
#[async_trait]
pub trait ExpenseParser: Send + Sync {
    /// `today` is the session's current date, used to resolve relative dates.
    async fn parse(&self, text: &str, today: NaiveDate) -> Result<ParsedExpense>;
}

/// The identity provider's view of the current session.
pub trait AuthSession: Send + Sync {
    fn user_id(&self) -> Option<String>;

    fn display_name(&self) -> Option<String>;

    /// Drop the session. Called on explicit logout and when persistence
    /// reports the session has expired.
    fn sign_out(&self) -> Result<()>;
}

/// A fixed in-process session, for tests and embedding.
#[derive(Debug, Default)]
pub struct StaticSession {
    inner: Mutex<Option<(String, String)>>,
}

impl StaticSession {
    pub fn signed_in(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Some((user_id.into(), display_name.into()))),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl AuthSession for StaticSession {
    fn user_id(&self) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|(id, _)| id.clone()))
    }

    fn display_name(&self) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|(_, name)| name.clone()))
    }

    fn sign_out(&self) -> Result<()> {
        let mut s = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        *s = None;
        Ok(())
    }
}
