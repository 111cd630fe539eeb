// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use finledger::engine::{NewAccount, NewCategory, NewTransaction, TransactionFilter, TransactionPatch};
use finledger::models::{AccountType, TransactionType};
use finledger::{Engine, EngineError};
use rust_decimal::Decimal;

const USER: i64 = 1;

struct Fixture {
    engine: Engine,
    account: i64,
    income: i64,
    expense: i64,
}

fn setup() -> Fixture {
    let mut engine = Engine::open_in_memory().unwrap();
    let account = engine
        .create_account(
            USER,
            NewAccount {
                name: "Checking".into(),
                r#type: AccountType::Bank,
                currency: Some("eur".into()),
                description: None,
            },
        )
        .unwrap()
        .id;
    let income = engine
        .create_category(
            USER,
            NewCategory {
                name: "Salary".into(),
                r#type: TransactionType::Income,
                icon: None,
                color: None,
            },
        )
        .unwrap()
        .id;
    let expense = engine
        .create_category(
            USER,
            NewCategory {
                name: "Groceries".into(),
                r#type: TransactionType::Expense,
                icon: None,
                color: Some("#00ff00".into()),
            },
        )
        .unwrap()
        .id;
    Fixture {
        engine,
        account,
        income,
        expense,
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn record(f: &mut Fixture, kind: TransactionType, amount: &str) -> i64 {
    let category_id = match kind {
        TransactionType::Income => f.income,
        TransactionType::Expense => f.expense,
    };
    f.engine
        .create_transaction(
            USER,
            NewTransaction {
                account_id: Some(f.account),
                category_id,
                r#type: kind,
                amount: dec(amount),
                description: String::new(),
                notes: None,
                transaction_date: day(1),
            },
        )
        .unwrap()
        .id
}

/// Balance must equal the signed sum of active transactions on the account.
fn assert_invariant(f: &Fixture) {
    let active = f
        .engine
        .list_transactions(
            USER,
            &TransactionFilter {
                account_id: Some(f.account),
                ..Default::default()
            },
        )
        .unwrap();
    let expected: Decimal = active.iter().map(|t| t.signed_amount()).sum();
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), expected);
    assert!(f.engine.verify_balances(USER).unwrap().is_empty());
}

#[test]
fn balance_tracks_every_lifecycle_step() {
    let mut f = setup();
    let salary = record(&mut f, TransactionType::Income, "1000.00");
    assert_invariant(&f);
    let rent = record(&mut f, TransactionType::Expense, "350.50");
    assert_invariant(&f);
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), dec("649.50"));

    f.engine
        .update_transaction(
            USER,
            rent,
            TransactionPatch {
                amount: Some(dec("400")),
                ..Default::default()
            },
        )
        .unwrap();
    assert_invariant(&f);
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), dec("600"));

    f.engine.delete_transaction(USER, salary).unwrap();
    assert_invariant(&f);
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), dec("-400"));

    f.engine.restore_transaction(USER, salary).unwrap();
    assert_invariant(&f);
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), dec("600"));
}

#[test]
fn delete_then_restore_is_net_zero() {
    let mut f = setup();
    record(&mut f, TransactionType::Income, "80");
    let id = record(&mut f, TransactionType::Expense, "19.99");
    let before = f.engine.account_balance(USER, f.account).unwrap();

    f.engine.delete_transaction(USER, id).unwrap();
    f.engine.restore_transaction(USER, id).unwrap();

    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), before);
    assert_invariant(&f);
}

#[test]
fn restore_into_deactivated_account_fails_without_side_effects() {
    let mut f = setup();
    let id = record(&mut f, TransactionType::Expense, "25");
    f.engine.delete_transaction(USER, id).unwrap();
    f.engine.deactivate_account(USER, f.account).unwrap();

    let err = f.engine.restore_transaction(USER, id).unwrap_err();
    assert!(matches!(err, EngineError::Inactive { entity: "account", .. }));
    assert!(!f.engine.get_transaction(USER, id).unwrap().is_active);
    assert_eq!(f.engine.account_balance(USER, f.account).unwrap(), Decimal::ZERO);
}

#[test]
fn failed_delta_rolls_back_the_row_write() {
    let mut f = setup();
    f.engine.deactivate_account(USER, f.account).unwrap();
    let err = f
        .engine
        .create_transaction(
            USER,
            NewTransaction {
                account_id: Some(f.account),
                category_id: f.expense,
                r#type: TransactionType::Expense,
                amount: dec("10"),
                description: "coffee".into(),
                notes: None,
                transaction_date: day(2),
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Inactive { .. }));
    let all = f
        .engine
        .list_transactions(
            USER,
            &TransactionFilter {
                include_inactive: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(all.is_empty());
}

#[test]
fn doctor_repairs_drifted_balance() {
    let mut f = setup();
    record(&mut f, TransactionType::Income, "100");
    f.engine
        .connection()
        .execute("UPDATE accounts SET balance = '7' WHERE id = ?1", [f.account])
        .unwrap();

    let drift = f.engine.verify_balances(USER).unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].stored, dec("7"));
    assert_eq!(drift[0].computed, dec("100"));

    assert_eq!(f.engine.recompute_balances(USER).unwrap(), 1);
    assert_invariant(&f);
}

#[test]
fn other_users_cannot_touch_the_account() {
    let mut f = setup();
    let err = f
        .engine
        .create_transaction(
            2,
            NewTransaction {
                account_id: Some(f.account),
                category_id: f.expense,
                r#type: TransactionType::Expense,
                amount: dec("1"),
                description: String::new(),
                notes: None,
                transaction_date: day(3),
            },
        )
        .unwrap_err();
    // The category belongs to user 1 as well, so it is reported first.
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert!(matches!(
        f.engine.get_account(2, f.account),
        Err(EngineError::NotFound { entity: "account", .. })
    ));
}

#[test]
fn amounts_beyond_thirteen_digits_are_refused_without_side_effects() {
    let mut f = setup();
    let huge = NewTransaction {
        account_id: Some(f.account),
        category_id: f.income,
        r#type: TransactionType::Income,
        amount: Decimal::MAX,
        description: String::new(),
        notes: None,
        transaction_date: day(2),
    };
    for _ in 0..2 {
        assert!(matches!(
            f.engine.create_transaction(USER, huge.clone()),
            Err(EngineError::InvalidAmount(_))
        ));
    }
    assert!(matches!(
        f.engine.create_transaction(
            USER,
            NewTransaction {
                amount: dec("10000000000000"),
                ..huge.clone()
            }
        ),
        Err(EngineError::InvalidAmount(_))
    ));

    record(&mut f, TransactionType::Income, "9999999999999.99");
    record(&mut f, TransactionType::Income, "9999999999999.99");
    assert_eq!(
        f.engine.account_balance(USER, f.account).unwrap(),
        dec("19999999999999.98")
    );
    assert_invariant(&f);
}
