// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction lifecycle.
//!
//! Each operation is a transition of one transaction row together with the
//! balance deltas it implies:
//!
//! | Operation | Requires   | Ledger effect                                      |
//! |-----------|------------|----------------------------------------------------|
//! | create    | -          | apply the signed amount to the account             |
//! | update    | active     | reverse the old delta, apply the new one           |
//! | delete    | active     | reverse the delta; tags and receipts are kept      |
//! | restore   | inactive   | apply the delta again (the account must be active) |
//!
//! Row write and deltas share one unit of work, so they commit together.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Value};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    error::{EngineError, ResultEngine},
    models::{AccountId, CategoryId, Tag, TagId, Transaction, TransactionId, TransactionType, UserId},
    utils::{decimal_column, normalize_optional_text, validate_amount},
};

use super::{Engine, categories, ledger, tags};

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, type, amount, \
     description, notes, transaction_date, is_active";

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Option<AccountId>,
    pub category_id: CategoryId,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub transaction_date: NaiveDate,
}

/// Fields left as `None` keep their current value. `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub account_id: Option<Option<AccountId>>,
    pub category_id: Option<CategoryId>,
    pub r#type: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub notes: Option<Option<String>>,
    pub transaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub r#type: Option<TransactionType>,
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub amount_min: Option<Decimal>,
    pub amount_max: Option<Decimal>,
    /// Case-insensitive match on description and notes.
    pub search: Option<String>,
    pub include_inactive: bool,
    pub limit: Option<usize>,
}

impl Engine {
    pub fn create_transaction(
        &mut self,
        user: UserId,
        new: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let amount = validate_amount(new.amount, "amount")?;
        let description = new.description.trim().to_string();
        let notes = normalize_optional_text(new.notes.as_deref());

        self.write("create_transaction", |conn| {
            check_category(conn, user, new.category_id, new.r#type)?;
            conn.execute(
                "INSERT INTO transactions(user_id, account_id, category_id, type, amount,
                                          description, notes, transaction_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user,
                    new.account_id,
                    new.category_id,
                    new.r#type,
                    amount.to_string(),
                    description,
                    notes,
                    new.transaction_date
                ],
            )?;
            let id = conn.last_insert_rowid();
            if let Some(account_id) = new.account_id {
                ledger::apply_delta(conn, user, account_id, new.r#type.signed(amount))?;
            }
            info!(user, transaction_id = id, %amount, "transaction created");
            require_owned(conn, user, id)
        })
    }

    /// Returns the transaction even when it is soft-deleted.
    pub fn get_transaction(&self, user: UserId, id: TransactionId) -> ResultEngine<Transaction> {
        self.read(|conn| require_owned(conn, user, id))
    }

    /// Newest first (`transaction_date`, then id).
    pub fn list_transactions(
        &self,
        user: UserId,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?");
        let mut values: Vec<Value> = vec![Value::Integer(user)];

        if !filter.include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(kind) = filter.r#type {
            sql.push_str(" AND type = ?");
            values.push(Value::Text(kind.as_str().into()));
        }
        if let Some(category_id) = filter.category_id {
            sql.push_str(" AND category_id = ?");
            values.push(Value::Integer(category_id));
        }
        if let Some(account_id) = filter.account_id {
            sql.push_str(" AND account_id = ?");
            values.push(Value::Integer(account_id));
        }
        if let Some(from) = filter.date_from {
            sql.push_str(" AND transaction_date >= ?");
            values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = filter.date_to {
            sql.push_str(" AND transaction_date <= ?");
            values.push(Value::Text(to.to_string()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (description LIKE ? OR IFNULL(notes, '') LIKE ?)");
            let pattern = format!("%{search}%");
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        sql.push_str(" ORDER BY transaction_date DESC, id DESC");

        // Amounts are TEXT, so range filters run on parsed decimals.
        let rows = self.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), map_row)?;
            rows.map(|row| row.map_err(EngineError::from))
                .collect::<ResultEngine<Vec<_>>>()
        })?;
        let matches = rows
            .into_iter()
            .filter(|t| filter.amount_min.is_none_or(|min| t.amount >= min))
            .filter(|t| filter.amount_max.is_none_or(|max| t.amount <= max));
        Ok(match filter.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }

    pub fn update_transaction(
        &mut self,
        user: UserId,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let amount = patch
            .amount
            .map(|a| validate_amount(a, "amount"))
            .transpose()?;

        self.write("update_transaction", |conn| {
            let old = require_active(conn, user, id)?;
            let account_id = patch.account_id.unwrap_or(old.account_id);
            let category_id = patch.category_id.unwrap_or(old.category_id);
            let kind = patch.r#type.unwrap_or(old.r#type);
            let amount = amount.unwrap_or(old.amount);
            let description = patch
                .description
                .as_deref()
                .map_or(old.description.clone(), |d| d.trim().to_string());
            let notes = match &patch.notes {
                Some(n) => normalize_optional_text(n.as_deref()),
                None => old.notes.clone(),
            };
            let date = patch.transaction_date.unwrap_or(old.transaction_date);

            if category_id != old.category_id || kind != old.r#type {
                check_category(conn, user, category_id, kind)?;
            }

            let new_signed = kind.signed(amount);
            if account_id != old.account_id || new_signed != old.signed_amount() {
                if let Some(old_account) = old.account_id {
                    ledger::reverse_delta(conn, user, old_account, old.signed_amount())?;
                }
                if let Some(new_account) = account_id {
                    ledger::apply_delta(conn, user, new_account, new_signed)?;
                }
            }

            conn.execute(
                "UPDATE transactions
                 SET account_id = ?1, category_id = ?2, type = ?3, amount = ?4, description = ?5,
                     notes = ?6, transaction_date = ?7, updated_at = datetime('now')
                 WHERE id = ?8",
                params![
                    account_id,
                    category_id,
                    kind,
                    amount.to_string(),
                    description,
                    notes,
                    date,
                    id
                ],
            )?;
            info!(user, transaction_id = id, "transaction updated");
            require_owned(conn, user, id)
        })
    }

    /// Soft delete: the row stays for audit, its balance effect is removed.
    pub fn delete_transaction(&mut self, user: UserId, id: TransactionId) -> ResultEngine<()> {
        self.write("delete_transaction", |conn| {
            let tx = require_active(conn, user, id)?;
            if let Some(account_id) = tx.account_id {
                ledger::reverse_delta(conn, user, account_id, tx.signed_amount())?;
            }
            set_active(conn, id, false)?;
            info!(user, transaction_id = id, "transaction deleted");
            Ok(())
        })
    }

    /// Fails with `Inactive` for the account when the linked account has been
    /// deactivated since the transaction was deleted.
    pub fn restore_transaction(
        &mut self,
        user: UserId,
        id: TransactionId,
    ) -> ResultEngine<Transaction> {
        self.write("restore_transaction", |conn| {
            let tx = require_owned(conn, user, id)?;
            if tx.is_active {
                return Err(EngineError::InvalidInput(format!(
                    "transaction {id} is already active"
                )));
            }
            if let Some(account_id) = tx.account_id {
                ledger::apply_delta(conn, user, account_id, tx.signed_amount())?;
            }
            set_active(conn, id, true)?;
            info!(user, transaction_id = id, "transaction restored");
            require_owned(conn, user, id)
        })
    }

    /// Returns `false` when the tag was already attached.
    pub fn attach_tag(&mut self, user: UserId, id: TransactionId, tag_id: TagId) -> ResultEngine<bool> {
        self.write("attach_tag", |conn| {
            require_active(conn, user, id)?;
            tags::require_active(conn, user, tag_id)?;
            Ok(insert_tag(conn, id, tag_id)?)
        })
    }

    /// Returns `false` when the tag was not attached.
    pub fn detach_tag(&mut self, user: UserId, id: TransactionId, tag_id: TagId) -> ResultEngine<bool> {
        self.write("detach_tag", |conn| {
            require_active(conn, user, id)?;
            tags::require_owned(conn, user, tag_id)?;
            Ok(remove_tag(conn, id, tag_id)?)
        })
    }

    /// Makes the tag set of a transaction exactly `tag_ids`.
    pub fn set_transaction_tags(
        &mut self,
        user: UserId,
        id: TransactionId,
        tag_ids: &[TagId],
    ) -> ResultEngine<Vec<Tag>> {
        let wanted: BTreeSet<TagId> = tag_ids.iter().copied().collect();
        self.write("set_transaction_tags", |conn| {
            require_active(conn, user, id)?;
            let current: BTreeSet<TagId> =
                load_tags(conn, id)?.into_iter().map(|tag| tag.id).collect();
            for tag_id in wanted.difference(&current) {
                tags::require_active(conn, user, *tag_id)?;
                insert_tag(conn, id, *tag_id)?;
            }
            for tag_id in current.difference(&wanted) {
                remove_tag(conn, id, *tag_id)?;
            }
            load_tags(conn, id)
        })
    }

    /// Tags attached to the transaction, deleted tags included.
    pub fn transaction_tags(&self, user: UserId, id: TransactionId) -> ResultEngine<Vec<Tag>> {
        self.read(|conn| {
            require_owned(conn, user, id)?;
            load_tags(conn, id)
        })
    }
}

/// Category must be visible to the user, active, and of the transaction's type.
fn check_category(
    conn: &Connection,
    user: UserId,
    category_id: CategoryId,
    kind: TransactionType,
) -> ResultEngine<()> {
    let category = categories::require_visible(conn, user, category_id)?;
    if !category.is_active {
        return Err(EngineError::inactive("category", category_id));
    }
    if category.r#type != kind {
        return Err(EngineError::TypeMismatch {
            expected: category.r#type,
            found: kind,
        });
    }
    Ok(())
}

pub(crate) fn require_owned(
    conn: &Connection,
    user: UserId,
    id: TransactionId,
) -> ResultEngine<Transaction> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user], map_row)
        .optional()?
        .ok_or_else(|| EngineError::not_found("transaction", id))
}

pub(crate) fn require_active(
    conn: &Connection,
    user: UserId,
    id: TransactionId,
) -> ResultEngine<Transaction> {
    let tx = require_owned(conn, user, id)?;
    if !tx.is_active {
        return Err(EngineError::inactive("transaction", id));
    }
    Ok(tx)
}

fn set_active(conn: &Connection, id: TransactionId, active: bool) -> ResultEngine<()> {
    conn.execute(
        "UPDATE transactions SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    Ok(())
}

fn insert_tag(conn: &Connection, id: TransactionId, tag_id: TagId) -> rusqlite::Result<bool> {
    let added = conn.execute(
        "INSERT OR IGNORE INTO transaction_tags(transaction_id, tag_id) VALUES (?1, ?2)",
        params![id, tag_id],
    )?;
    Ok(added > 0)
}

fn remove_tag(conn: &Connection, id: TransactionId, tag_id: TagId) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM transaction_tags WHERE transaction_id = ?1 AND tag_id = ?2",
        params![id, tag_id],
    )?;
    Ok(removed > 0)
}

fn load_tags(conn: &Connection, id: TransactionId) -> ResultEngine<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.user_id, g.name, g.is_active
         FROM transaction_tags tt JOIN tags g ON g.id = tt.tag_id
         WHERE tt.transaction_id = ?1
         ORDER BY g.name",
    )?;
    let rows = stmt.query_map(params![id], tags::map_row)?;
    rows.map(|row| row.map_err(EngineError::from)).collect()
}

pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        r#type: row.get(4)?,
        amount: decimal_column(row, 5)?,
        description: row.get(6)?,
        notes: row.get(7)?,
        transaction_date: row.get(8)?,
        is_active: row.get(9)?,
    })
}
