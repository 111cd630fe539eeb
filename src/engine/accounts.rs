// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::{
    db,
    error::{EngineError, ResultEngine},
    models::{Account, AccountId, AccountType, UserId},
    policy::{self, Entity, Removal},
    utils::{decimal_column, normalize_optional_text, normalize_required_name},
};

use super::Engine;

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, type, balance, currency, description, is_active, version";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub r#type: AccountType,
    /// Falls back to the `default_currency` setting.
    pub currency: Option<String>,
    pub description: Option<String>,
}

/// Editable account fields. Balance and currency are not among them.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub r#type: Option<AccountType>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountTypeSummary {
    pub r#type: AccountType,
    pub account_count: u64,
    pub total_balance: Decimal,
}

/// Outcome of a hard account deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedAccount {
    pub account_id: AccountId,
    /// Balance the account held when it was removed; it is not carried anywhere.
    pub discarded_balance: Decimal,
    /// Transactions that became unassigned history.
    pub detached_transactions: usize,
}

impl Engine {
    pub fn create_account(&mut self, user: UserId, new: NewAccount) -> ResultEngine<Account> {
        let name = normalize_required_name(&new.name, "account")?;
        let description = normalize_optional_text(new.description.as_deref());
        let currency = new.currency.as_deref().map(normalize_currency).transpose()?;

        self.write("create_account", |conn| {
            let currency = match &currency {
                Some(ccy) => ccy.clone(),
                None => db::get_default_currency(conn)?,
            };
            conn.execute(
                "INSERT INTO accounts(user_id, name, type, balance, currency, description)
                 VALUES (?1, ?2, ?3, '0', ?4, ?5)",
                params![user, name, new.r#type, currency, description],
            )?;
            let id = conn.last_insert_rowid();
            info!(user, account_id = id, "account created");
            require_owned(conn, user, id)
        })
    }

    /// Returns the account even when it is inactive.
    pub fn get_account(&self, user: UserId, id: AccountId) -> ResultEngine<Account> {
        self.read(|conn| require_owned(conn, user, id))
    }

    pub fn list_accounts(&self, user: UserId, include_inactive: bool) -> ResultEngine<Vec<Account>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts
                 WHERE user_id = ?1 AND (?2 OR is_active = 1)
                 ORDER BY name, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user, include_inactive], map_row)?;
            rows.map(|row| row.map_err(EngineError::from)).collect()
        })
    }

    pub fn update_account(
        &mut self,
        user: UserId,
        id: AccountId,
        patch: AccountPatch,
    ) -> ResultEngine<Account> {
        let name = patch
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "account"))
            .transpose()?;

        self.write("update_account", |conn| {
            let current = require_owned(conn, user, id)?;
            if !current.is_active {
                return Err(EngineError::inactive("account", id));
            }
            let description = match &patch.description {
                Some(d) => normalize_optional_text(d.as_deref()),
                None => current.description.clone(),
            };
            conn.execute(
                "UPDATE accounts SET name = ?1, type = ?2, description = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                params![
                    name.as_deref().unwrap_or(&current.name),
                    patch.r#type.unwrap_or(current.r#type),
                    description,
                    id
                ],
            )?;
            require_owned(conn, user, id)
        })
    }

    /// Soft-deletes the account. Deltas already posted stay in its balance,
    /// but no transaction may move money in or out until it is restored.
    pub fn deactivate_account(&mut self, user: UserId, id: AccountId) -> ResultEngine<()> {
        self.write("deactivate_account", |conn| {
            let current = require_owned(conn, user, id)?;
            if !current.is_active {
                return Err(EngineError::inactive("account", id));
            }
            policy::apply_removal(conn, Entity::Account, id, Removal::Soft)?;
            set_active(conn, id, false)?;
            info!(user, account_id = id, "account deactivated");
            Ok(())
        })
    }

    pub fn restore_account(&mut self, user: UserId, id: AccountId) -> ResultEngine<Account> {
        self.write("restore_account", |conn| {
            let current = require_owned(conn, user, id)?;
            if current.is_active {
                return Err(EngineError::InvalidInput(format!(
                    "account {id} is already active"
                )));
            }
            set_active(conn, id, true)?;
            info!(user, account_id = id, "account restored");
            require_owned(conn, user, id)
        })
    }

    /// Removes the account row for good.
    ///
    /// Its transactions survive as unassigned history with their amounts
    /// untouched; the account's balance is discarded with it.
    pub fn delete_account(&mut self, user: UserId, id: AccountId) -> ResultEngine<DeletedAccount> {
        self.write("delete_account", |conn| {
            let current = require_owned(conn, user, id)?;
            let effects = policy::apply_removal(conn, Entity::Account, id, Removal::Hard)?;
            conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
            info!(
                user,
                account_id = id,
                detached = effects.detached,
                "account deleted"
            );
            Ok(DeletedAccount {
                account_id: id,
                discarded_balance: current.balance,
                detached_transactions: effects.detached,
            })
        })
    }

    /// Currency given to new accounts that do not name one.
    pub fn default_currency(&self) -> ResultEngine<String> {
        self.read(|conn| Ok(db::get_default_currency(conn)?))
    }

    pub fn set_default_currency(&mut self, currency: &str) -> ResultEngine<String> {
        let currency = normalize_currency(currency)?;
        self.write("set_default_currency", |conn| {
            db::set_default_currency(conn, &currency)?;
            Ok(currency.clone())
        })
    }

    /// Totals of active accounts grouped by account type.
    pub fn account_summary(&self, user: UserId) -> ResultEngine<Vec<AccountTypeSummary>> {
        let accounts = self.list_accounts(user, false)?;
        let mut by_type: BTreeMap<&'static str, AccountTypeSummary> = BTreeMap::new();
        for account in &accounts {
            let entry = by_type
                .entry(account.r#type.as_str())
                .or_insert_with(|| AccountTypeSummary {
                    r#type: account.r#type,
                    account_count: 0,
                    total_balance: Decimal::ZERO,
                });
            entry.account_count += 1;
            entry.total_balance += account.balance;
        }
        Ok(by_type.into_values().collect())
    }
}

/// Loads an account owned by `user`; other users' accounts are reported as missing.
pub(crate) fn require_owned(conn: &Connection, user: UserId, id: AccountId) -> ResultEngine<Account> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user], map_row)
        .optional()?
        .ok_or_else(|| EngineError::not_found("account", id))
}

pub(crate) fn require_active(conn: &Connection, user: UserId, id: AccountId) -> ResultEngine<Account> {
    let account = require_owned(conn, user, id)?;
    if !account.is_active {
        return Err(EngineError::inactive("account", id));
    }
    Ok(account)
}

fn set_active(conn: &Connection, id: AccountId, active: bool) -> ResultEngine<()> {
    conn.execute(
        "UPDATE accounts SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    Ok(())
}

fn normalize_currency(raw: &str) -> ResultEngine<String> {
    let ccy = raw.trim().to_uppercase();
    if ccy.len() != 3 || !ccy.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EngineError::InvalidInput(format!(
            "invalid currency code '{raw}'"
        )));
    }
    Ok(ccy)
}

pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        r#type: row.get(3)?,
        balance: decimal_column(row, 4)?,
        currency: row.get(5)?,
        description: row.get(6)?,
        is_active: row.get(7)?,
        version: row.get(8)?,
    })
}
