// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Errors surfaced by the ledger engine.
//!
//! Validation errors ([`TypeMismatch`], [`DuplicatePeriod`], [`InvalidAmount`],
//! [`InvalidInput`]) are raised before anything is written. A
//! [`ConcurrencyConflict`] is only surfaced after the engine has exhausted its
//! retry budget and is always safe to retry.
//!
//! [`TypeMismatch`]: EngineError::TypeMismatch
//! [`DuplicatePeriod`]: EngineError::DuplicatePeriod
//! [`InvalidAmount`]: EngineError::InvalidAmount
//! [`InvalidInput`]: EngineError::InvalidInput
//! [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
use chrono::NaiveDate;
use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::{CategoryId, PeriodType, TransactionType};

pub type ResultEngine<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The entity does not exist or belongs to another user.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The entity is soft-deleted and the operation does not allow that.
    #[error("{entity} {id} is inactive")]
    Inactive { entity: &'static str, id: i64 },

    /// A protected relationship still points at the entity.
    #[error("{entity} {id} is still referenced by {count} {referrer} row(s)")]
    ReferencedEntity {
        entity: &'static str,
        id: i64,
        referrer: &'static str,
        count: i64,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: TransactionType,
        found: TransactionType,
    },

    #[error("an active {period_type} budget starting {start_date} already exists for category {category_id}")]
    DuplicatePeriod {
        category_id: CategoryId,
        period_type: PeriodType,
        start_date: NaiveDate,
    },

    /// Lost update detected on an account balance, or the database stayed busy.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("the worker pool has shut down")]
    PoolShutdown,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                EngineError::ConcurrencyConflict(value.to_string())
            }
            other => EngineError::Database(other),
        }
    }
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn inactive(entity: &'static str, id: i64) -> Self {
        Self::Inactive { entity, id }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}
