// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{OptionalExtension, Row, params};
use tracing::info;

use crate::{
    error::{EngineError, ResultEngine},
    models::{Receipt, ReceiptId, TransactionId, UserId},
    utils::normalize_required_name,
};

use super::{Engine, transactions};

/// Receipt metadata. The file itself lives wherever `file_path` points.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
}

impl Engine {
    pub fn attach_receipt(
        &mut self,
        user: UserId,
        transaction_id: TransactionId,
        new: NewReceipt,
    ) -> ResultEngine<Receipt> {
        let file_path = normalize_required_name(&new.file_path, "receipt file")?;
        let file_name = normalize_required_name(&new.file_name, "receipt")?;
        let mime_type = new.mime_type.trim().to_ascii_lowercase();
        if !mime_type.contains('/') {
            return Err(EngineError::InvalidInput(format!(
                "invalid mime type '{}'",
                new.mime_type
            )));
        }
        let file_size = i64::try_from(new.file_size)
            .map_err(|_| EngineError::InvalidInput("receipt file is too large".into()))?;

        self.write("attach_receipt", |conn| {
            transactions::require_active(conn, user, transaction_id)?;
            conn.execute(
                "INSERT INTO receipts(transaction_id, file_path, file_name, file_size, mime_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![transaction_id, file_path, file_name, file_size, mime_type],
            )?;
            let id = conn.last_insert_rowid();
            info!(user, transaction_id, receipt_id = id, "receipt attached");
            conn.query_row(
                "SELECT id, transaction_id, file_path, file_name, file_size, mime_type, is_active
                 FROM receipts WHERE id = ?1",
                params![id],
                map_row,
            )
            .map_err(EngineError::from)
        })
    }

    pub fn list_receipts(
        &self,
        user: UserId,
        transaction_id: TransactionId,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Receipt>> {
        self.read(|conn| {
            transactions::require_owned(conn, user, transaction_id)?;
            let mut stmt = conn.prepare(
                "SELECT id, transaction_id, file_path, file_name, file_size, mime_type, is_active
                 FROM receipts
                 WHERE transaction_id = ?1 AND (?2 OR is_active = 1)
                 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![transaction_id, include_inactive], map_row)?;
            rows.map(|row| row.map_err(EngineError::from)).collect()
        })
    }

    /// Soft delete; ownership is checked through the parent transaction.
    pub fn delete_receipt(&mut self, user: UserId, id: ReceiptId) -> ResultEngine<()> {
        self.write("delete_receipt", |conn| {
            let active: bool = conn
                .query_row(
                    "SELECT r.is_active FROM receipts r
                     JOIN transactions t ON t.id = r.transaction_id
                     WHERE r.id = ?1 AND t.user_id = ?2",
                    params![id, user],
                    |r| r.get(0),
                )
                .optional()?
                .ok_or_else(|| EngineError::not_found("receipt", id))?;
            if !active {
                return Err(EngineError::inactive("receipt", id));
            }
            conn.execute("UPDATE receipts SET is_active = 0 WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Receipt> {
    Ok(Receipt {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        file_path: row.get(2)?,
        file_name: row.get(3)?,
        file_size: row.get(4)?,
        mime_type: row.get(5)?,
        is_active: row.get(6)?,
    })
}
