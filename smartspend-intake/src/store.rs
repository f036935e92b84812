//! # State Store
//!
//! In-memory copy of the signed-in user's expenses, budgets and chat log.
//! Mutations apply to memory first and are then mirrored to persistence.
//! A failed mirror is logged and never rolled back. Expense creation is the
//! exception: it only touches memory after the backend accepted the write.

use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use smartspend_core::{budget_left_after, Budget, BudgetBook, ChatMessage, Expense, NewExpense};

use crate::collaborators::{AuthSession, Persistence};
use crate::error::{is_session_expired, StoreError};

/// Seeded into the chat log after a full wipe.
pub const WIPE_CONFIRMATION: &str =
    "All your data has been cleared. Your budgets are back to the defaults.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub expenses: Vec<Expense>,
    pub budgets: BudgetBook,
    pub chat: Vec<ChatMessage>,
}

impl SessionState {
    /// Baseline for a session with no persisted data.
    pub fn fresh() -> Self {
        Self {
            expenses: Vec::new(),
            budgets: BudgetBook::defaults(),
            chat: Vec::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::fresh()
    }
}

pub struct StateStore {
    persistence: Arc<dyn Persistence>,
    auth: Arc<dyn AuthSession>,
    state: RwLock<SessionState>,
}

impl StateStore {
    pub fn new(persistence: Arc<dyn Persistence>, auth: Arc<dyn AuthSession>) -> Self {
        Self {
            persistence,
            auth,
            state: RwLock::new(SessionState::fresh()),
        }
    }

    pub fn auth(&self) -> &dyn AuthSession {
        self.auth.as_ref()
    }

    pub fn snapshot(&self) -> SessionState {
        self.read(Clone::clone)
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.read(|s| s.expenses.clone())
    }

    pub fn budgets(&self) -> BudgetBook {
        self.read(|s| s.budgets.clone())
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.read(|s| s.chat.clone())
    }

    // The lock is never held across an await, so a poisoned lock only means a
    // panic mid-closure; the data is still consistent enough to keep going.
    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the in-memory state with the user's persisted data.
    ///
    /// With no signed-in user this resets to the baseline state. A user with
    /// no saved budgets gets the default set.
    pub async fn load(&self) -> Result<(), StoreError> {
        let Some(user) = self.auth.user_id() else {
            debug!("no session, loading baseline state");
            self.write(|s| *s = SessionState::fresh());
            return Ok(());
        };

        let stored = self
            .persistence
            .fetch_all(&user)
            .await
            .map_err(|e| self.persistence_failed(e))?;

        let budgets = if stored.budgets.is_empty() {
            BudgetBook::defaults()
        } else {
            BudgetBook::from(stored.budgets)
        };
        info!(
            expenses = stored.expenses.len(),
            budgets = budgets.len(),
            messages = stored.chat.len(),
            "loaded session state"
        );
        self.write(|s| {
            *s = SessionState {
                expenses: stored.expenses,
                budgets,
                chat: stored.chat,
            }
        });
        Ok(())
    }

    /// Save an expense, then append it locally.
    ///
    /// Returns the canonical expense and the signed budget left in its
    /// category for its month, counting everything recorded before it plus
    /// itself. Nothing changes locally when the write fails.
    pub async fn record_expense(&self, expense: NewExpense) -> Result<(Expense, f64), StoreError> {
        let user = self.auth.user_id().ok_or(StoreError::NotSignedIn)?;
        let saved = self
            .persistence
            .insert_expense(&user, &expense)
            .await
            .map_err(|e| self.persistence_failed(e))?;

        let as_new = NewExpense::new(
            saved.amount,
            saved.category.clone(),
            saved.description.clone(),
            saved.date,
        );
        let budget_left = self.write(|s| {
            let left = budget_left_after(&s.expenses, &s.budgets, &as_new);
            s.expenses.push(saved.clone());
            left
        });
        info!(id = %saved.id, category = %saved.category, amount = saved.amount, budget_left, "expense recorded");
        Ok((saved, budget_left))
    }

    pub async fn push_chat(&self, message: ChatMessage) {
        self.write(|s| s.chat.push(message.clone()));
        let Some(user) = self.auth.user_id() else {
            return;
        };
        if let Err(e) = self.persistence.append_chat(&user, &message).await {
            self.mirror_failed("append chat message", e);
        }
    }

    /// Set the cap for a category, matching existing budgets case-insensitively.
    pub async fn upsert_budget(&self, category: &str, limit: f64) -> Result<Budget, StoreError> {
        if category.trim().is_empty() {
            return Err(StoreError::InvalidBudget("category is blank".into()));
        }
        if !limit.is_finite() || limit < 0.0 {
            return Err(StoreError::InvalidBudget(format!(
                "limit must be a non-negative number, got {limit}"
            )));
        }

        let budget = self.write(|s| s.budgets.upsert(category, limit).clone());
        info!(category = %budget.category, limit, "budget set");

        if let Some(user) = self.auth.user_id() {
            if let Err(e) = self
                .persistence
                .upsert_budgets(&user, std::slice::from_ref(&budget))
                .await
            {
                self.mirror_failed("upsert budget", e);
            }
        }
        Ok(budget)
    }

    /// Remove the budget whose category is exactly `category`.
    pub async fn delete_budget(&self, category: &str) -> bool {
        let Some(removed) = self.write(|s| s.budgets.remove_exact(category)) else {
            debug!(category, "no budget to delete");
            return false;
        };
        info!(category = %removed.category, "budget deleted");

        if let Some(user) = self.auth.user_id() {
            if let Err(e) = self.persistence.delete_budget(&user, category).await {
                self.mirror_failed("delete budget", e);
            }
        }
        true
    }

    /// Clear expenses and chat, restore default budgets, and seed one
    /// confirmation message.
    pub async fn wipe(&self) {
        let seed = ChatMessage::assistant(WIPE_CONFIRMATION);
        let defaults = self.write(|s| {
            *s = SessionState::fresh();
            s.chat.push(seed.clone());
            s.budgets.as_slice().to_vec()
        });
        info!("session data wiped");

        let Some(user) = self.auth.user_id() else {
            return;
        };
        if let Err(e) = self.mirror_wipe(&user, &defaults, &seed).await {
            self.mirror_failed("wipe user data", e);
        }
    }

    async fn mirror_wipe(&self, user: &str, defaults: &[Budget], seed: &ChatMessage) -> Result<()> {
        self.persistence.delete_all(user).await?;
        self.persistence.upsert_budgets(user, defaults).await?;
        self.persistence.append_chat(user, seed).await?;
        Ok(())
    }

    /// Reset to the baseline state and end the auth session.
    pub fn sign_out(&self) {
        self.write(|s| *s = SessionState::fresh());
        if let Err(e) = self.auth.sign_out() {
            warn!(error = %e, "auth sign-out failed");
        }
        info!("signed out");
    }

    fn persistence_failed(&self, err: anyhow::Error) -> StoreError {
        if is_session_expired(&err) {
            warn!(error = %err, "session expired, forcing sign-out");
            self.sign_out();
            StoreError::SessionExpired
        } else {
            StoreError::Persistence(err)
        }
    }

    fn mirror_failed(&self, what: &str, err: anyhow::Error) {
        if is_session_expired(&err) {
            warn!(error = %err, "session expired during {what}, forcing sign-out");
            self.sign_out();
        } else {
            warn!(error = %format!("{err:#}"), "failed to {what}; local state kept");
        }
    }
}
