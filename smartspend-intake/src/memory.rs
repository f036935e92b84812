//! In-process persistence backend.
//!
//! Backs the CLI's `--ephemeral` mode and the tests. Writes can be made to
//! fail, and the session can be expired, to exercise the store's error paths.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use smartspend_core::{budget::normalize_category, Budget, ChatMessage, Expense, NewExpense};

use crate::collaborators::{Persistence, StoredState};
use crate::error::SessionExpired;

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    users: Mutex<HashMap<String, StoredState>>,
    fail_writes: AtomicBool,
    expired: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a user's data.
    pub fn seeded(user_id: &str, state: StoredState) -> Self {
        let p = Self::new();
        if let Ok(mut users) = p.users.lock() {
            users.insert(user_id.to_string(), state);
        }
        p
    }

    /// Make every subsequent write fail (reads keep working).
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with [`SessionExpired`].
    pub fn expire_session(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    /// Copy of what is stored for a user.
    pub fn stored(&self, user_id: &str) -> StoredState {
        self.users
            .lock()
            .ok()
            .and_then(|u| u.get(user_id).cloned())
            .unwrap_or_default()
    }

    fn check_session(&self) -> Result<()> {
        if self.expired.load(Ordering::SeqCst) {
            return Err(SessionExpired("refresh token expired".into()).into());
        }
        Ok(())
    }

    fn write<T>(&self, user_id: &str, f: impl FnOnce(&mut StoredState) -> T) -> Result<T> {
        self.check_session()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write rejected by backend");
        }
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(f(users.entry(user_id.to_string()).or_default()))
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn fetch_all(&self, user_id: &str) -> Result<StoredState> {
        self.check_session()?;
        Ok(self.stored(user_id))
    }

    async fn insert_expense(&self, user_id: &str, expense: &NewExpense) -> Result<Expense> {
        self.write(user_id, |s| {
            let saved = expense.clone().into_expense(uuid::Uuid::new_v4().to_string());
            s.expenses.push(saved.clone());
            saved
        })
    }

    async fn upsert_budgets(&self, user_id: &str, budgets: &[Budget]) -> Result<()> {
        self.write(user_id, |s| {
            for b in budgets {
                let key = normalize_category(&b.category);
                match s
                    .budgets
                    .iter_mut()
                    .find(|x| normalize_category(&x.category) == key)
                {
                    Some(existing) => existing.limit = b.limit,
                    None => s.budgets.push(b.clone()),
                }
            }
        })
    }

    async fn delete_budget(&self, user_id: &str, category: &str) -> Result<()> {
        self.write(user_id, |s| s.budgets.retain(|b| b.category != category))
    }

    async fn append_chat(&self, user_id: &str, message: &ChatMessage) -> Result<()> {
        self.write(user_id, |s| s.chat.push(message.clone()))
    }

    async fn delete_all(&self, user_id: &str) -> Result<()> {
        self.write(user_id, |s| *s = StoredState::default())
    }
}
