use chrono::NaiveDate;
use smartspend_core::{category_breakdown, month_summary, trend, BudgetBook, DateRange, Role};
use smartspend_intake::{
    IntakeOutcome, IntakePipeline, MemoryPersistence, RuleParser, StateStore, StaticSession,
    StoredState, WIPE_CONFIRMATION,
};
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn session(p: Arc<MemoryPersistence>) -> (Arc<StateStore>, IntakePipeline) {
    let store = Arc::new(StateStore::new(
        p,
        Arc::new(StaticSession::signed_in("user-1", "Asha")),
    ));
    let pipeline = IntakePipeline::new(store.clone(), Arc::new(RuleParser::new().unwrap()))
        .with_currency("₹")
        .with_clock(today);
    (store, pipeline)
}

#[tokio::test]
async fn test_chat_session_end_to_end() {
    let p = Arc::new(MemoryPersistence::new());
    let (store, pipeline) = session(p.clone());
    store.load().await.unwrap();

    assert!(matches!(
        pipeline.submit("groceries 12,000 on 2026-10-02").await,
        IntakeOutcome::Saved { .. }
    ));
    assert!(matches!(
        pipeline.submit("uber 300 yesterday").await,
        IntakeOutcome::Saved { budget_left, .. } if budget_left == 4700.0
    ));
    let out = pipeline.submit("dinner 2000").await;
    assert!(matches!(out, IntakeOutcome::Saved { budget_left, .. } if budget_left == 1000.0));
    assert_eq!(
        pipeline.submit("bought something nice").await,
        IntakeOutcome::NeedsAmount
    );

    let expenses = store.expenses();
    assert_eq!(expenses.len(), 3);
    assert_eq!(expenses[1].date, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());

    let chat = store.chat();
    assert_eq!(chat.len(), 8);
    assert_eq!(chat.iter().filter(|m| m.role == Role::User).count(), 4);
    assert_eq!(chat.iter().filter(|m| m.meta.is_some()).count(), 3);

    let rows = category_breakdown(&expenses, &store.budgets(), &DateRange::default(), today());
    let cats: Vec<_> = rows.iter().map(|r| (r.category.as_str(), r.spent)).collect();
    assert_eq!(cats, vec![("Food", 14000.0), ("Transport", 300.0)]);

    let summary = month_summary(&expenses, &store.budgets(), today());
    assert_eq!(summary.spent, 14300.0);
    assert!(summary.over_budget.is_empty());

    let points = trend(&expenses, 5, today());
    assert_eq!(points.last().unwrap().total, 14300.0);

    // a fresh session for the same user sees the same data
    let (reloaded, _) = session(p.clone());
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.expenses(), expenses);
    assert_eq!(reloaded.chat().len(), 8);
}

#[tokio::test]
async fn test_budget_edits_then_wipe() {
    let p = Arc::new(MemoryPersistence::seeded(
        "user-1",
        StoredState {
            budgets: vec![
                smartspend_core::Budget::new("Food", 500.0),
                smartspend_core::Budget::new("Travel", 9000.0),
            ],
            ..Default::default()
        },
    ));
    let (store, pipeline) = session(p.clone());
    store.load().await.unwrap();
    assert_eq!(store.budgets().len(), 2);

    store.upsert_budget("FOOD", 800.0).await.unwrap();
    assert!(store.delete_budget("Travel").await);
    store.upsert_budget("Travel", 100.0).await.unwrap();

    let budgets = store.budgets();
    assert_eq!(budgets.len(), 2);
    assert_eq!(budgets.limit_for("food"), 800.0);
    assert_eq!(budgets.limit_for("travel"), 100.0);
    assert_eq!(p.stored("user-1").budgets.len(), 2);

    pipeline.submit("lunch 900").await;
    store.wipe().await;

    let s = store.snapshot();
    assert!(s.expenses.is_empty());
    assert_eq!(s.budgets, BudgetBook::defaults());
    assert_eq!(s.chat.len(), 1);
    assert_eq!(s.chat[0].role, Role::Assistant);
    assert_eq!(s.chat[0].text, WIPE_CONFIRMATION);

    let (reloaded, _) = session(p);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.snapshot().budgets, BudgetBook::defaults());
    assert_eq!(reloaded.chat().len(), 1);
}
