// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use finledger::engine::{NewAccount, NewCategory, NewReceipt, NewTransaction, TransactionFilter, TransactionPatch};
use finledger::models::{AccountType, TransactionType};
use finledger::{Engine, EngineError};
use rust_decimal::Decimal;

const USER: i64 = 1;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn account(engine: &mut Engine, name: &str) -> i64 {
    engine
        .create_account(
            USER,
            NewAccount {
                name: name.into(),
                r#type: AccountType::Cash,
                currency: None,
                description: None,
            },
        )
        .unwrap()
        .id
}

fn category(engine: &mut Engine, name: &str, kind: TransactionType) -> i64 {
    engine
        .create_category(
            USER,
            NewCategory {
                name: name.into(),
                r#type: kind,
                icon: None,
                color: None,
            },
        )
        .unwrap()
        .id
}

fn expense(account_id: Option<i64>, category_id: i64, amount: &str, on: NaiveDate, text: &str) -> NewTransaction {
    NewTransaction {
        account_id,
        category_id,
        r#type: TransactionType::Expense,
        amount: dec(amount),
        description: text.into(),
        notes: None,
        transaction_date: on,
    }
}

#[test]
fn category_type_must_match() {
    let mut engine = Engine::open_in_memory().unwrap();
    let wallet = account(&mut engine, "Wallet");
    let salary = category(&mut engine, "Salary", TransactionType::Income);

    let err = engine
        .create_transaction(USER, expense(Some(wallet), salary, "10", date(1, 1), "oops"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::TypeMismatch {
            expected: TransactionType::Income,
            found: TransactionType::Expense
        }
    ));
    assert_eq!(engine.account_balance(USER, wallet).unwrap(), Decimal::ZERO);
}

#[test]
fn invalid_amounts_are_rejected_before_writing() {
    let mut engine = Engine::open_in_memory().unwrap();
    let food = category(&mut engine, "Food", TransactionType::Expense);
    for bad in ["0", "-3", "1.001"] {
        let err = engine
            .create_transaction(USER, expense(None, food, bad, date(1, 1), ""))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)), "{bad}");
    }
}

#[test]
fn moving_between_accounts_moves_the_delta() {
    let mut engine = Engine::open_in_memory().unwrap();
    let a = account(&mut engine, "A");
    let b = account(&mut engine, "B");
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let tx = engine
        .create_transaction(USER, expense(Some(a), food, "42", date(2, 3), "lunch"))
        .unwrap();
    assert_eq!(engine.account_balance(USER, a).unwrap(), dec("-42"));

    engine
        .update_transaction(
            USER,
            tx.id,
            TransactionPatch {
                account_id: Some(Some(b)),
                amount: Some(dec("40")),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(engine.account_balance(USER, a).unwrap(), Decimal::ZERO);
    assert_eq!(engine.account_balance(USER, b).unwrap(), dec("-40"));

    engine
        .update_transaction(
            USER,
            tx.id,
            TransactionPatch {
                account_id: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(engine.account_balance(USER, b).unwrap(), Decimal::ZERO);
}

#[test]
fn changing_type_requires_matching_category() {
    let mut engine = Engine::open_in_memory().unwrap();
    let wallet = account(&mut engine, "Wallet");
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let refund = category(&mut engine, "Refunds", TransactionType::Income);
    let tx = engine
        .create_transaction(USER, expense(Some(wallet), food, "15", date(2, 1), ""))
        .unwrap();

    let err = engine
        .update_transaction(
            USER,
            tx.id,
            TransactionPatch {
                r#type: Some(TransactionType::Income),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::TypeMismatch { .. }));
    assert_eq!(engine.account_balance(USER, wallet).unwrap(), dec("-15"));

    engine
        .update_transaction(
            USER,
            tx.id,
            TransactionPatch {
                r#type: Some(TransactionType::Income),
                category_id: Some(refund),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(engine.account_balance(USER, wallet).unwrap(), dec("15"));
}

#[test]
fn soft_deleted_transactions_stay_inspectable_but_frozen() {
    let mut engine = Engine::open_in_memory().unwrap();
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let tx = engine
        .create_transaction(USER, expense(None, food, "5", date(1, 5), "snack"))
        .unwrap();
    engine.delete_transaction(USER, tx.id).unwrap();

    assert!(!engine.get_transaction(USER, tx.id).unwrap().is_active);
    assert!(matches!(
        engine.delete_transaction(USER, tx.id),
        Err(EngineError::Inactive { entity: "transaction", .. })
    ));
    assert!(matches!(
        engine.update_transaction(USER, tx.id, TransactionPatch::default()),
        Err(EngineError::Inactive { .. })
    ));
    assert!(engine.restore_transaction(USER, tx.id).unwrap().is_active);
    assert!(matches!(
        engine.restore_transaction(USER, tx.id),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn tag_attach_and_detach_are_idempotent() {
    let mut engine = Engine::open_in_memory().unwrap();
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let tx = engine
        .create_transaction(USER, expense(None, food, "9", date(1, 9), ""))
        .unwrap();
    let trip = engine.create_tag(USER, "trip").unwrap();

    assert!(engine.attach_tag(USER, tx.id, trip.id).unwrap());
    assert!(!engine.attach_tag(USER, tx.id, trip.id).unwrap());
    assert_eq!(engine.transaction_tags(USER, tx.id).unwrap(), vec![trip.clone()]);

    assert!(engine.detach_tag(USER, tx.id, trip.id).unwrap());
    assert!(!engine.detach_tag(USER, tx.id, trip.id).unwrap());
    assert!(engine.transaction_tags(USER, tx.id).unwrap().is_empty());
}

#[test]
fn deleting_keeps_tags_and_receipts() {
    let mut engine = Engine::open_in_memory().unwrap();
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let tx = engine
        .create_transaction(USER, expense(None, food, "30", date(3, 1), "market"))
        .unwrap();
    let a = engine.create_tag(USER, "weekly").unwrap();
    let b = engine.create_tag(USER, "cash").unwrap();
    let tags = engine.set_transaction_tags(USER, tx.id, &[a.id, b.id]).unwrap();
    assert_eq!(tags.len(), 2);
    engine
        .attach_receipt(
            USER,
            tx.id,
            NewReceipt {
                file_path: "receipts/market.jpg".into(),
                file_name: "market.jpg".into(),
                file_size: 2048,
                mime_type: "image/jpeg".into(),
            },
        )
        .unwrap();

    engine.delete_transaction(USER, tx.id).unwrap();
    assert_eq!(engine.transaction_tags(USER, tx.id).unwrap().len(), 2);
    assert_eq!(engine.list_receipts(USER, tx.id, false).unwrap().len(), 1);
    assert!(matches!(
        engine.attach_tag(USER, tx.id, a.id),
        Err(EngineError::Inactive { entity: "transaction", .. })
    ));
}

#[test]
fn inactive_tags_cannot_be_attached() {
    let mut engine = Engine::open_in_memory().unwrap();
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let tx = engine
        .create_transaction(USER, expense(None, food, "3", date(1, 2), ""))
        .unwrap();
    let tag = engine.create_tag(USER, "old").unwrap();
    engine.delete_tag(USER, tag.id).unwrap();
    assert!(matches!(
        engine.attach_tag(USER, tx.id, tag.id),
        Err(EngineError::Inactive { entity: "tag", .. })
    ));
    engine.restore_tag(USER, tag.id).unwrap();
    assert!(engine.attach_tag(USER, tx.id, tag.id).unwrap());
}

#[test]
fn filters_and_ordering() {
    let mut engine = Engine::open_in_memory().unwrap();
    let wallet = account(&mut engine, "Wallet");
    let food = category(&mut engine, "Food", TransactionType::Expense);
    let fun = category(&mut engine, "Fun", TransactionType::Expense);
    let first = engine
        .create_transaction(USER, expense(Some(wallet), food, "10", date(1, 10), "Bakery"))
        .unwrap();
    let second = engine
        .create_transaction(USER, expense(None, fun, "60", date(1, 20), "Cinema night"))
        .unwrap();
    let third = engine
        .create_transaction(USER, expense(Some(wallet), food, "25", date(2, 1), "bakery again"))
        .unwrap();
    engine.delete_transaction(USER, first.id).unwrap();

    let all = engine.list_transactions(USER, &TransactionFilter::default()).unwrap();
    let ids: Vec<i64> = all.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id]);

    let with_inactive = TransactionFilter {
        include_inactive: true,
        search: Some("bakery".into()),
        ..Default::default()
    };
    let ids: Vec<i64> = engine
        .list_transactions(USER, &with_inactive)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![third.id, first.id]);

    let ranged = TransactionFilter {
        amount_min: Some(dec("20")),
        amount_max: Some(dec("50")),
        date_from: Some(date(1, 15)),
        ..Default::default()
    };
    let found = engine.list_transactions(USER, &ranged).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, third.id);

    let limited = TransactionFilter {
        limit: Some(1),
        ..Default::default()
    };
    assert_eq!(engine.list_transactions(USER, &limited).unwrap()[0].id, third.id);
}
