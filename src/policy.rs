// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Referential rules between entities.
//!
//! Every parent/child relationship carries an explicit [`RefPolicy`]. The
//! engine consults [`RELATIONSHIPS`] before removing a parent instead of
//! leaning on SQLite `ON DELETE` clauses, so the rules behave the same on any
//! storage backend and can be tested on their own.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::{EngineError, ResultEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefPolicy {
    /// Children are removed together with the parent.
    Cascade,
    /// Children survive with their reference cleared.
    SetNull,
    /// The parent cannot be removed while any child exists.
    Protect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Account,
    Category,
    Transaction,
    Tag,
    Budget,
    Receipt,
    TransactionTag,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Category => "category",
            Self::Transaction => "transaction",
            Self::Tag => "tag",
            Self::Budget => "budget",
            Self::Receipt => "receipt",
            Self::TransactionTag => "transaction_tag",
        }
    }
}

/// How the parent is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// `is_active` flips to false; history stays in place.
    Soft,
    /// The row is physically deleted.
    Hard,
}

#[derive(Debug, Clone, Copy)]
pub struct Relationship {
    pub parent: Entity,
    pub child: Entity,
    pub child_table: &'static str,
    pub child_column: &'static str,
    pub policy: RefPolicy,
}

pub const RELATIONSHIPS: &[Relationship] = &[
    Relationship {
        parent: Entity::Account,
        child: Entity::Transaction,
        child_table: "transactions",
        child_column: "account_id",
        policy: RefPolicy::SetNull,
    },
    Relationship {
        parent: Entity::Category,
        child: Entity::Transaction,
        child_table: "transactions",
        child_column: "category_id",
        policy: RefPolicy::Protect,
    },
    Relationship {
        parent: Entity::Category,
        child: Entity::Budget,
        child_table: "budgets",
        child_column: "category_id",
        policy: RefPolicy::Protect,
    },
    Relationship {
        parent: Entity::Transaction,
        child: Entity::Receipt,
        child_table: "receipts",
        child_column: "transaction_id",
        policy: RefPolicy::Cascade,
    },
    Relationship {
        parent: Entity::Transaction,
        child: Entity::TransactionTag,
        child_table: "transaction_tags",
        child_column: "transaction_id",
        policy: RefPolicy::Cascade,
    },
    Relationship {
        parent: Entity::Tag,
        child: Entity::TransactionTag,
        child_table: "transaction_tags",
        child_column: "tag_id",
        policy: RefPolicy::Cascade,
    },
];

pub fn relationships_of(parent: Entity) -> impl Iterator<Item = &'static Relationship> {
    RELATIONSHIPS.iter().filter(move |rel| rel.parent == parent)
}

/// What removing a parent did to its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalEffects {
    pub cascaded: usize,
    pub detached: usize,
}

/// Applies every relationship policy of `parent` before it is removed.
///
/// `Protect` is checked first and applies to soft and hard removal alike, so a
/// refused removal leaves every child untouched. `Cascade` and `SetNull` only
/// run on hard removal: a soft-deleted parent keeps its children as history.
pub fn apply_removal(
    conn: &Connection,
    parent: Entity,
    parent_id: i64,
    removal: Removal,
) -> ResultEngine<RemovalEffects> {
    for rel in relationships_of(parent).filter(|rel| rel.policy == RefPolicy::Protect) {
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                rel.child_table, rel.child_column
            ),
            params![parent_id],
            |r| r.get(0),
        )?;
        if count > 0 {
            return Err(EngineError::ReferencedEntity {
                entity: parent.as_str(),
                id: parent_id,
                referrer: rel.child.as_str(),
                count,
            });
        }
    }

    let mut effects = RemovalEffects::default();
    if removal == Removal::Soft {
        return Ok(effects);
    }
    for rel in relationships_of(parent) {
        match rel.policy {
            RefPolicy::Cascade => {
                effects.cascaded += conn.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1",
                        rel.child_table, rel.child_column
                    ),
                    params![parent_id],
                )?;
            }
            RefPolicy::SetNull => {
                effects.detached += conn.execute(
                    &format!(
                        "UPDATE {} SET {col} = NULL, updated_at = datetime('now') WHERE {col} = ?1",
                        rel.child_table,
                        col = rel.child_column
                    ),
                    params![parent_id],
                )?;
            }
            RefPolicy::Protect => {}
        }
    }
    Ok(effects)
}
