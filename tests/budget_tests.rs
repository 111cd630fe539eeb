// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use finledger::engine::{BudgetPatch, NewBudget, NewCategory, NewTransaction};
use finledger::models::{Budget, BudgetStatus, PeriodType, TransactionType};
use finledger::{Engine, EngineError};
use rust_decimal::Decimal;

const USER: i64 = 1;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (Engine, i64) {
    let mut engine = Engine::open_in_memory().unwrap();
    let dining = engine
        .create_category(
            USER,
            NewCategory {
                name: "Dining".into(),
                r#type: TransactionType::Expense,
                icon: None,
                color: None,
            },
        )
        .unwrap()
        .id;
    (engine, dining)
}

fn monthly(category_id: i64, amount: i64, start: NaiveDate) -> NewBudget {
    NewBudget {
        category_id,
        amount: Decimal::new(amount, 0),
        period_type: PeriodType::Monthly,
        start_date: start,
        end_date: None,
    }
}

fn book(engine: &mut Engine, category_id: i64, kind: TransactionType, amount: i64, on: NaiveDate) -> i64 {
    engine
        .create_transaction(
            USER,
            NewTransaction {
                account_id: None,
                category_id,
                r#type: kind,
                amount: Decimal::new(amount, 0),
                description: String::new(),
                notes: None,
                transaction_date: on,
            },
        )
        .unwrap()
        .id
}

#[test]
fn monthly_window_is_the_calendar_month_of_the_query() {
    let (mut engine, dining) = setup();
    engine
        .create_budget(USER, monthly(dining, 500, date(2024, 1, 15)))
        .unwrap();

    let budget = engine
        .resolve_active_budget(USER, dining, date(2024, 3, 10))
        .unwrap()
        .unwrap();
    let u = engine
        .compute_utilization(USER, &budget, date(2024, 3, 10))
        .unwrap();
    assert_eq!(u.window.start, date(2024, 3, 1));
    assert_eq!(u.window.end, date(2024, 3, 31));
}

#[test]
fn utilization_ignores_deleted_and_out_of_window_spend() {
    let (mut engine, dining) = setup();
    let budget = engine
        .create_budget(USER, monthly(dining, 500, date(2024, 1, 1)))
        .unwrap();
    book(&mut engine, dining, TransactionType::Expense, 120, date(2024, 3, 2));
    book(&mut engine, dining, TransactionType::Expense, 200, date(2024, 3, 31));
    let big = book(&mut engine, dining, TransactionType::Expense, 1000, date(2024, 3, 15));
    engine.delete_transaction(USER, big).unwrap();
    book(&mut engine, dining, TransactionType::Expense, 75, date(2024, 4, 1));

    let u = engine
        .compute_utilization(USER, &budget, date(2024, 3, 10))
        .unwrap();
    assert_eq!(u.spent, Decimal::new(320, 0));
    assert_eq!(u.remaining, Decimal::new(180, 0));
    assert!(!u.over_budget);
    assert_eq!(u.percentage_used, Decimal::new(64, 0));
}

#[test]
fn going_over_is_reported_not_enforced() {
    let (mut engine, dining) = setup();
    let budget = engine
        .create_budget(USER, monthly(dining, 50, date(2024, 6, 1)))
        .unwrap();
    book(&mut engine, dining, TransactionType::Expense, 80, date(2024, 6, 9));

    let u = engine.compute_utilization(USER, &budget, date(2024, 6, 30)).unwrap();
    assert!(u.over_budget);
    assert_eq!(u.remaining, Decimal::new(-30, 0));
}

#[test]
fn duplicate_active_period_is_rejected() {
    let (mut engine, dining) = setup();
    let first = engine
        .create_budget(USER, monthly(dining, 100, date(2024, 1, 1)))
        .unwrap();
    let err = engine
        .create_budget(USER, monthly(dining, 200, date(2024, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicatePeriod { .. }));

    // A yearly budget on the same start date is a different slot.
    engine
        .create_budget(
            USER,
            NewBudget {
                period_type: PeriodType::Yearly,
                ..monthly(dining, 1200, date(2024, 1, 1))
            },
        )
        .unwrap();

    engine.delete_budget(USER, first.id).unwrap();
    let second = engine
        .create_budget(USER, monthly(dining, 200, date(2024, 1, 1)))
        .unwrap();
    assert!(matches!(
        engine.restore_budget(USER, first.id),
        Err(EngineError::DuplicatePeriod { .. })
    ));
    engine.delete_budget(USER, second.id).unwrap();
    assert!(engine.restore_budget(USER, first.id).unwrap().is_active);
}

#[test]
fn latest_start_wins_and_end_date_bounds_lifetime() {
    let (mut engine, dining) = setup();
    engine
        .create_budget(USER, monthly(dining, 100, date(2024, 1, 1)))
        .unwrap();
    let newer = engine
        .create_budget(
            USER,
            NewBudget {
                end_date: Some(date(2024, 6, 30)),
                ..monthly(dining, 300, date(2024, 4, 1))
            },
        )
        .unwrap();

    let picked = engine
        .resolve_active_budget(USER, dining, date(2024, 5, 1))
        .unwrap()
        .unwrap();
    assert_eq!(picked.id, newer.id);

    let later = engine
        .resolve_active_budget(USER, dining, date(2024, 7, 1))
        .unwrap()
        .unwrap();
    assert_eq!(later.amount, Decimal::new(100, 0));

    assert!(engine
        .resolve_active_budget(USER, dining, date(2023, 12, 31))
        .unwrap()
        .is_none());
}

#[test]
fn income_does_not_offset_spend_and_income_categories_are_refused() {
    let (mut engine, dining) = setup();
    let refunds = engine
        .create_category(
            USER,
            NewCategory {
                name: "Refunds".into(),
                r#type: TransactionType::Income,
                icon: None,
                color: None,
            },
        )
        .unwrap()
        .id;
    assert!(matches!(
        engine.create_budget(USER, monthly(refunds, 10, date(2024, 1, 1))),
        Err(EngineError::TypeMismatch {
            expected: TransactionType::Expense,
            found: TransactionType::Income
        })
    ));

    let budget = engine
        .create_budget(USER, monthly(dining, 100, date(2024, 1, 1)))
        .unwrap();
    book(&mut engine, dining, TransactionType::Expense, 40, date(2024, 2, 2));
    book(&mut engine, refunds, TransactionType::Income, 40, date(2024, 2, 3));
    let u = engine.compute_utilization(USER, &budget, date(2024, 2, 28)).unwrap();
    assert_eq!(u.spent, Decimal::new(40, 0));
}

#[test]
fn status_lists_covering_budgets_and_update_validates_end() {
    let (mut engine, dining) = setup();
    let budget = engine
        .create_budget(USER, monthly(dining, 100, date(2024, 3, 1)))
        .unwrap();
    book(&mut engine, dining, TransactionType::Expense, 10, date(2024, 3, 3));

    let status = engine.budget_status(USER, date(2024, 3, 20)).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].spent, Decimal::new(10, 0));
    assert!(engine.budget_status(USER, date(2024, 2, 20)).unwrap().is_empty());

    assert!(matches!(
        engine.update_budget(
            USER,
            budget.id,
            BudgetPatch {
                end_date: Some(Some(date(2024, 2, 1))),
                ..Default::default()
            }
        ),
        Err(EngineError::InvalidInput(_))
    ));
    let raised = engine
        .update_budget(
            USER,
            budget.id,
            BudgetPatch {
                amount: Some(Decimal::new(150, 0)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(raised.amount, Decimal::new(150, 0));
}

#[test]
fn other_users_budgets_are_invisible() {
    let (mut engine, dining) = setup();
    let budget = engine
        .create_budget(USER, monthly(dining, 100, date(2024, 1, 1)))
        .unwrap();
    assert!(matches!(
        engine.get_budget(2, budget.id),
        Err(EngineError::NotFound { entity: "budget", .. })
    ));
    assert!(matches!(
        engine.compute_utilization(2, &budget, date(2024, 1, 5)),
        Err(EngineError::NotFound { .. })
    ));
}

#[test]
fn utilization_reloads_the_stored_budget() {
    let (mut engine, dining) = setup();
    let budget = engine
        .create_budget(
            USER,
            NewBudget {
                end_date: Some(date(2024, 3, 31)),
                ..monthly(dining, 100, date(2024, 2, 1))
            },
        )
        .unwrap();

    // A stale copy with a different limit is ignored.
    let stale = Budget {
        amount: Decimal::new(1, 0),
        ..budget.clone()
    };
    let u = engine.compute_utilization(USER, &stale, date(2024, 3, 1)).unwrap();
    assert_eq!(u.limit, Decimal::new(100, 0));

    assert!(matches!(
        engine.compute_utilization(USER, &budget, date(2024, 1, 31)),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.compute_utilization(USER, &budget, date(2024, 4, 1)),
        Err(EngineError::InvalidInput(_))
    ));

    // Forging the owner does not grant access.
    let forged = Budget {
        user_id: 2,
        ..budget.clone()
    };
    assert!(matches!(
        engine.compute_utilization(2, &forged, date(2024, 3, 1)),
        Err(EngineError::NotFound { entity: "budget", .. })
    ));

    engine.delete_budget(USER, budget.id).unwrap();
    assert!(matches!(
        engine.compute_utilization(USER, &budget, date(2024, 3, 1)),
        Err(EngineError::Inactive { entity: "budget", .. })
    ));
}

#[test]
fn summary_buckets_budgets_and_analysis_sorts_by_usage() {
    let (mut engine, dining) = setup();
    let mut category = |name: &str| {
        engine
            .create_category(
                USER,
                NewCategory {
                    name: name.into(),
                    r#type: TransactionType::Expense,
                    icon: None,
                    color: None,
                },
            )
            .unwrap()
            .id
    };
    let travel = category("Travel");
    let books = category("Books");
    let gym = category("Gym");

    let start = date(2024, 1, 1);
    let on = date(2024, 5, 10);
    let over = engine.create_budget(USER, monthly(dining, 100, start)).unwrap();
    let warn = engine.create_budget(USER, monthly(travel, 100, start)).unwrap();
    let track = engine.create_budget(USER, monthly(books, 100, start)).unwrap();
    let fine = engine.create_budget(USER, monthly(gym, 100, start)).unwrap();
    book(&mut engine, dining, TransactionType::Expense, 100, on);
    book(&mut engine, travel, TransactionType::Expense, 80, on);
    book(&mut engine, books, TransactionType::Expense, 50, on);
    book(&mut engine, gym, TransactionType::Expense, 49, on);

    let status = engine.budget_status(USER, on).unwrap();
    let by_id = |id: i64| status.iter().find(|u| u.budget_id == id).unwrap().status;
    assert_eq!(by_id(over.id), BudgetStatus::Exceeded);
    assert_eq!(by_id(warn.id), BudgetStatus::Warning);
    assert_eq!(by_id(track.id), BudgetStatus::OnTrack);
    assert_eq!(by_id(fine.id), BudgetStatus::Good);

    let exceeded = engine.exceeded_budgets(USER, on).unwrap();
    assert_eq!(exceeded.len(), 1);
    assert_eq!(exceeded[0].budget_id, over.id);
    // Reaching the limit exactly is exceeded but not over budget.
    assert!(!exceeded[0].over_budget);

    let order: Vec<_> = engine
        .category_analysis(USER, on)
        .unwrap()
        .iter()
        .map(|u| u.budget_id)
        .collect();
    assert_eq!(order, vec![over.id, warn.id, track.id, fine.id]);

    let summary = engine.budget_summary(USER, on).unwrap();
    assert_eq!(summary.total_budgets, 4);
    assert_eq!(summary.total_budgeted, Decimal::new(400, 0));
    assert_eq!(summary.total_spent, Decimal::new(279, 0));
    assert_eq!(summary.total_remaining, Decimal::new(121, 0));
    assert_eq!(summary.average_usage, Decimal::new(6975, 2));
    assert_eq!(
        (summary.exceeded, summary.warning, summary.on_track, summary.good),
        (1, 1, 1, 1)
    );

    let before = engine.budget_summary(USER, date(2023, 12, 31)).unwrap();
    assert_eq!(before.total_budgets, 0);
    assert_eq!(before.average_usage, Decimal::ZERO);
}
