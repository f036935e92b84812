//! On-disk persistence: one pretty-printed JSON document per user.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use smartspend_core::{normalize_category, Budget, ChatMessage, Expense, NewExpense};
use smartspend_intake::{Persistence, StoredState};

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    async fn read(&self, p: &Path) -> Result<StoredState> {
        match tokio::fs::read_to_string(p).await {
            Ok(s) => serde_json::from_str(&s).with_context(|| format!("parse {}", p.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredState::default()),
            Err(e) => Err(e).with_context(|| format!("read {}", p.display())),
        }
    }

    async fn update<T>(&self, user_id: &str, f: impl FnOnce(&mut StoredState) -> T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let p = self.path_for(user_id);
        let mut state = self.read(&p).await?;
        let out = f(&mut state);

        // write to a sibling and rename so a crash never leaves half a file
        let tmp = p.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&state)?;
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &p)
            .await
            .with_context(|| format!("rename {}", p.display()))?;
        debug!(path = %p.display(), "saved user data");
        Ok(out)
    }
}

#[async_trait]
impl Persistence for JsonFileStore {
    async fn fetch_all(&self, user_id: &str) -> Result<StoredState> {
        self.read(&self.path_for(user_id)).await
    }

    async fn insert_expense(&self, user_id: &str, expense: &NewExpense) -> Result<Expense> {
        self.update(user_id, |s| {
            let saved = expense.clone().into_expense(uuid::Uuid::new_v4().to_string());
            s.expenses.push(saved.clone());
            saved
        })
        .await
    }

    async fn upsert_budgets(&self, user_id: &str, budgets: &[Budget]) -> Result<()> {
        self.update(user_id, |s| {
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
        .await
    }

    async fn delete_budget(&self, user_id: &str, category: &str) -> Result<()> {
        self.update(user_id, |s| s.budgets.retain(|b| b.category != category))
            .await
    }

    async fn append_chat(&self, user_id: &str, message: &ChatMessage) -> Result<()> {
        self.update(user_id, |s| s.chat.push(message.clone())).await
    }

    async fn delete_all(&self, user_id: &str) -> Result<()> {
        self.update(user_id, |s| *s = StoredState::default()).await
    }
}
