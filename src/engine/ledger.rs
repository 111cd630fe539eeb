// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance bookkeeping.
//!
//! An account balance is a stored value that must always equal the signed sum
//! of the account's active transactions. Only this module writes `balance`, and
//! it does so with a version compare-and-swap so two units of work can never
//! both read the same balance and overwrite each other.

use std::collections::HashMap;

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{EngineError, ResultEngine},
    models::{AccountId, TransactionType, UserId},
    utils::{checked_total, decimal_column},
};

use super::{Engine, accounts};

/// An account whose stored balance disagrees with its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDiscrepancy {
    pub account_id: AccountId,
    pub name: String,
    pub stored: Decimal,
    pub computed: Decimal,
}

/// Adds `delta` to an active account's balance and returns the new balance.
pub(crate) fn apply_delta(
    conn: &Connection,
    user: UserId,
    account_id: AccountId,
    delta: Decimal,
) -> ResultEngine<Decimal> {
    let account = accounts::require_active(conn, user, account_id)?;
    let balance = account.balance.checked_add(delta).ok_or_else(|| {
        EngineError::InvalidAmount(format!("balance of account {account_id} would overflow"))
    })?;
    let changed = conn.execute(
        "UPDATE accounts SET balance = ?1, version = version + 1, updated_at = datetime('now')
         WHERE id = ?2 AND version = ?3",
        params![balance.to_string(), account_id, account.version],
    )?;
    if changed == 0 {
        return Err(EngineError::ConcurrencyConflict(format!(
            "balance of account {account_id} changed concurrently"
        )));
    }
    debug!(account_id, %delta, %balance, "balance updated");
    Ok(balance)
}

/// Undoes a delta previously posted with [`apply_delta`].
pub(crate) fn reverse_delta(
    conn: &Connection,
    user: UserId,
    account_id: AccountId,
    delta: Decimal,
) -> ResultEngine<Decimal> {
    apply_delta(conn, user, account_id, -delta)
}

fn computed_balances(conn: &Connection, user: UserId) -> ResultEngine<HashMap<AccountId, Decimal>> {
    let mut stmt = conn.prepare(
        "SELECT account_id, type, amount FROM transactions
         WHERE user_id = ?1 AND is_active = 1 AND account_id IS NOT NULL",
    )?;
    let mut rows = stmt.query(params![user])?;
    let mut sums: HashMap<AccountId, Decimal> = HashMap::new();
    while let Some(row) = rows.next()? {
        let account_id: AccountId = row.get(0)?;
        let kind: TransactionType = row.get(1)?;
        let amount = decimal_column(row, 2)?;
        let sum = sums.entry(account_id).or_default();
        *sum = checked_total(*sum, kind.signed(amount))?;
    }
    Ok(sums)
}

fn discrepancies(conn: &Connection, user: UserId) -> ResultEngine<Vec<BalanceDiscrepancy>> {
    let sums = computed_balances(conn, user)?;
    let mut out = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, name, balance FROM accounts WHERE user_id = ?1 ORDER BY id",
    )?;
    let mut rows = stmt.query(params![user])?;
    while let Some(row) = rows.next()? {
        let account_id: AccountId = row.get(0)?;
        let stored = decimal_column(row, 2)?;
        let computed = sums.get(&account_id).copied().unwrap_or_default();
        if stored != computed {
            out.push(BalanceDiscrepancy {
                account_id,
                name: row.get(1)?,
                stored,
                computed,
            });
        }
    }
    Ok(out)
}

impl Engine {
    pub fn account_balance(&self, user: UserId, account_id: AccountId) -> ResultEngine<Decimal> {
        Ok(self.get_account(user, account_id)?.balance)
    }

    /// Lists accounts whose stored balance differs from the sum of their
    /// active transactions. Empty when the ledger is consistent.
    pub fn verify_balances(&self, user: UserId) -> ResultEngine<Vec<BalanceDiscrepancy>> {
        let found = self.read(|conn| discrepancies(conn, user))?;
        if !found.is_empty() {
            warn!(user, count = found.len(), "balance discrepancies found");
        }
        Ok(found)
    }

    /// Rewrites every drifted balance from transaction history and returns how
    /// many accounts were corrected.
    pub fn recompute_balances(&mut self, user: UserId) -> ResultEngine<usize> {
        self.write("recompute_balances", |conn| {
            let found = discrepancies(conn, user)?;
            for d in &found {
                conn.execute(
                    "UPDATE accounts SET balance = ?1, version = version + 1, updated_at = datetime('now')
                     WHERE id = ?2",
                    params![d.computed.to_string(), d.account_id],
                )?;
            }
            if !found.is_empty() {
                info!(user, corrected = found.len(), "balances recomputed");
            }
            Ok(found.len())
        })
    }
}
