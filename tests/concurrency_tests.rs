// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::{thread, time::Duration};

use chrono::NaiveDate;
use finledger::engine::{NewAccount, NewCategory, NewTransaction};
use finledger::models::{AccountType, TransactionType};
use finledger::{Engine, EngineConfig, EngineError, EnginePool, RetryPolicy, db};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use rust_decimal::Decimal;

const USER: i64 = 1;

struct Setup {
    _dir: tempfile::TempDir,
    config: EngineConfig,
    account: i64,
    income: i64,
    expense: i64,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::with_path(dir.path().join("ledger.sqlite"));
    config.max_attempts = 50;
    config.workers = 4;
    let mut engine = Engine::open(&config).unwrap();
    let account = engine
        .create_account(
            USER,
            NewAccount {
                name: "Shared".into(),
                r#type: AccountType::Bank,
                currency: None,
                description: None,
            },
        )
        .unwrap()
        .id;
    let mut category = |name: &str, kind| {
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
    };
    let income = category("In", TransactionType::Income);
    let expense = category("Out", TransactionType::Expense);
    Setup {
        _dir: dir,
        config,
        account,
        income,
        expense,
    }
}

fn entry(account: i64, category_id: i64, kind: TransactionType, amount: i64) -> NewTransaction {
    NewTransaction {
        account_id: Some(account),
        category_id,
        r#type: kind,
        amount: Decimal::new(amount, 0),
        description: String::new(),
        notes: None,
        transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    }
}

#[test]
fn parallel_writers_never_lose_a_delta() {
    let mut rng = StdRng::seed_from_u64(0x1ed6e5);
    for round in 0..5 {
        let s = setup();
        let threads = rng.gen_range(2..=6);
        let mut entries: Vec<(TransactionType, i64)> = (0..threads * 8)
            .map(|_| {
                let kind = if rng.gen_bool(0.5) {
                    TransactionType::Income
                } else {
                    TransactionType::Expense
                };
                (kind, rng.gen_range(1..=500))
            })
            .collect();
        entries.shuffle(&mut rng);
        let expected: i64 = entries
            .iter()
            .map(|(kind, amount)| match kind {
                TransactionType::Income => *amount,
                TransactionType::Expense => -amount,
            })
            .sum();

        let handles: Vec<_> = entries
            .chunks(8)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let config = s.config.clone();
                let (account, income, expense) = (s.account, s.income, s.expense);
                thread::spawn(move || {
                    let mut engine = Engine::open(&config).unwrap();
                    for (kind, amount) in chunk {
                        let category = match kind {
                            TransactionType::Income => income,
                            TransactionType::Expense => expense,
                        };
                        engine
                            .create_transaction(USER, entry(account, category, kind, amount))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let engine = Engine::open(&s.config).unwrap();
        assert_eq!(
            engine.account_balance(USER, s.account).unwrap(),
            Decimal::new(expected, 0),
            "round {round} with {threads} threads"
        );
        assert!(engine.verify_balances(USER).unwrap().is_empty());
    }
}

#[test]
fn conflict_surfaces_after_bounded_retries() {
    let s = setup();
    let conn = db::open(&s.config.db_path, Duration::from_millis(10)).unwrap();
    let mut engine = Engine::from_connection(
        conn,
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        },
    )
    .unwrap();

    let blocker = rusqlite::Connection::open(&s.config.db_path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = engine
        .create_transaction(USER, entry(s.account, s.income, TransactionType::Income, 70))
        .unwrap_err();
    assert!(matches!(err, EngineError::ConcurrencyConflict(_)), "{err:?}");
    assert!(err.is_retryable());

    blocker.execute_batch("COMMIT").unwrap();
    assert_eq!(engine.account_balance(USER, s.account).unwrap(), Decimal::ZERO);

    engine
        .create_transaction(USER, entry(s.account, s.income, TransactionType::Income, 70))
        .unwrap();
    assert_eq!(engine.account_balance(USER, s.account).unwrap(), Decimal::new(70, 0));
}

#[test]
fn pool_runs_jobs_across_workers() {
    let s = setup();
    let pool = EnginePool::open(&s.config).unwrap();
    assert_eq!(pool.size(), 4);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let (account, income, expense) = (s.account, s.income, s.expense);
            pool.submit(move |engine| {
                let tx = if i % 2 == 0 {
                    entry(account, income, TransactionType::Income, 50)
                } else {
                    entry(account, expense, TransactionType::Expense, 20)
                };
                engine.create_transaction(USER, tx).map(|t| t.id)
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    let account = s.account;
    let balance = pool
        .submit(move |engine| engine.account_balance(USER, account))
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(balance, Decimal::new(300, 0));
}
