//! # Expense Intake Pipeline
//!
//! utterance -> user chat message -> parser -> validation -> persistence ->
//! budget math -> assistant reply.
//!
//! Only one submission runs at a time; a second one while the first is still
//! parsing or saving is turned away with [`IntakeOutcome::Busy`].

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use smartspend_core::{time::local_today, ChatMessage, Expense};

use crate::collaborators::ExpenseParser;
use crate::error::StoreError;
use crate::store::StateStore;

pub const RESTATE_AMOUNT: &str =
    "I couldn't find an amount in that. How much did you spend? Try something like \"250 on lunch\".";
pub const SAVE_FAILED: &str = "I couldn't save that expense. Please try again in a moment.";
pub const SIGNED_OUT: &str = "You're signed out, so I couldn't save that. Please sign in again.";

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Another submission is still outstanding; nothing happened
    Busy,
    /// Parser failed or gave no usable amount; user was asked to restate
    NeedsAmount,
    /// Parsed fine but persistence refused the write; local state untouched
    SaveFailed,
    Saved { expense: Expense, budget_left: f64 },
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct IntakePipeline {
    store: Arc<StateStore>,
    parser: Arc<dyn ExpenseParser>,
    currency: String,
    today: Clock,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IntakePipeline {
    pub fn new(store: Arc<StateStore>, parser: Arc<dyn ExpenseParser>) -> Self {
        Self {
            store,
            parser,
            currency: String::new(),
            today: Arc::new(local_today),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Symbol prefixed to amounts in replies.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Source of "today" for relative dates and month budgets.
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(&self, text: &str) -> IntakeOutcome {
        let text = text.trim();
        if text.is_empty() {
            return IntakeOutcome::Ignored;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("submission rejected, previous one still in flight");
            return IntakeOutcome::Busy;
        };

        self.store.push_chat(ChatMessage::user(text)).await;

        let today = (self.today)();
        let parsed = match self.parser.parse(text, today).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "expense parser failed");
                None
            }
        };

        let budgets = self.store.budgets();
        let Some(new) = parsed.and_then(|p| p.into_new_expense(text, today, &budgets)) else {
            self.reply(ChatMessage::assistant(RESTATE_AMOUNT)).await;
            return IntakeOutcome::NeedsAmount;
        };
        debug!(amount = new.amount, category = %new.category, date = %new.date, "parsed expense");

        match self.store.record_expense(new).await {
            Ok((expense, budget_left)) => {
                let text = self.saved_text(&expense, budget_left);
                self.reply(ChatMessage::assistant(text).with_meta(expense.clone(), budget_left))
                    .await;
                IntakeOutcome::Saved {
                    expense,
                    budget_left,
                }
            }
            Err(e) => {
                warn!(error = %e, "could not save expense");
                let text = match e {
                    StoreError::NotSignedIn | StoreError::SessionExpired => SIGNED_OUT,
                    _ => SAVE_FAILED,
                };
                self.reply(ChatMessage::assistant(text)).await;
                IntakeOutcome::SaveFailed
            }
        }
    }

    async fn reply(&self, message: ChatMessage) {
        self.store.push_chat(message).await;
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency, amount)
    }

    fn saved_text(&self, expense: &Expense, budget_left: f64) -> String {
        let category = &expense.category;
        let head = format!("Saved {} for {}.", self.money(expense.amount), category);
        if self.store.budgets().get(category).is_none() {
            return format!("{head} There is no budget set for {category}.");
        }
        if budget_left >= 0.0 {
            format!(
                "{head} {} left in your {category} budget this month.",
                self.money(budget_left)
            )
        } else {
            format!(
                "{head} You are {} over your {category} budget this month.",
                self.money(-budget_left)
            )
        }
    }
}
