// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The ledger and budget consistency engine.
//!
//! Every mutating call runs as one unit of work: a SQLite `BEGIN IMMEDIATE`
//! transaction holding the row writes and the balance deltas they imply. A
//! failure at any step drops the transaction, which rolls everything back.
//! Conflicts (busy database, lost balance update) rerun the whole unit a
//! bounded number of times.

use std::{thread, time::Duration};

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, warn};

use crate::{
    config::EngineConfig,
    db,
    error::{EngineError, ResultEngine},
};

pub mod accounts;
pub mod analytics;
pub mod budgets;
pub mod categories;
pub mod ledger;
pub mod receipts;
pub mod tags;
pub mod transactions;

pub use accounts::{AccountPatch, AccountTypeSummary, DeletedAccount, NewAccount};
pub use analytics::{DateRange, GroupBy, GroupKey, Summary, SummaryRow, TransactionStats};
pub use budgets::{BudgetPatch, BudgetSummary, NewBudget, PeriodWindow, Utilization};
pub use categories::{CategoryPatch, NewCategory};
pub use ledger::BalanceDiscrepancy;
pub use receipts::NewReceipt;
pub use transactions::{NewTransaction, TransactionFilter, TransactionPatch};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    conn: Connection,
    retry: RetryPolicy,
}

impl Engine {
    pub fn open(config: &EngineConfig) -> ResultEngine<Self> {
        let conn = db::open(&config.db_path, config.busy_timeout)?;
        Ok(Self {
            conn,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: config.retry_backoff,
            },
        })
    }

    pub fn open_in_memory() -> ResultEngine<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
            retry: RetryPolicy::default(),
        })
    }

    /// Wraps an existing connection, creating the schema if needed.
    pub fn from_connection(conn: Connection, retry: RetryPolicy) -> ResultEngine<Self> {
        db::init_schema(&conn)?;
        Ok(Self { conn, retry })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `work` as one atomic unit, retrying on concurrency conflicts.
    ///
    /// `work` may run more than once, so it must not have side effects
    /// outside the connection it is given.
    pub(crate) fn write<T, F>(&mut self, operation: &'static str, mut work: F) -> ResultEngine<T>
    where
        F: FnMut(&Connection) -> ResultEngine<T>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 1;
        loop {
            match run_immediate(&mut self.conn, &mut work) {
                Ok(value) => {
                    debug!(operation, attempt, "unit of work committed");
                    return Ok(value);
                }
                Err(EngineError::ConcurrencyConflict(reason)) if attempt < max_attempts => {
                    warn!(operation, attempt, %reason, "conflict, retrying unit of work");
                    thread::sleep(self.retry.backoff * attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs `work` against a single read snapshot.
    pub(crate) fn read<T, F>(&self, work: F) -> ResultEngine<T>
    where
        F: FnOnce(&Connection) -> ResultEngine<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = work(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn run_immediate<T, F>(conn: &mut Connection, work: &mut F) -> ResultEngine<T>
where
    F: FnMut(&Connection) -> ResultEngine<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = work(&*tx)?;
    tx.commit()?;
    Ok(value)
}
