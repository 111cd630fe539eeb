// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::{
    error::{EngineError, ResultEngine},
    models::{Tag, TagId, UserId},
    policy::{self, Entity, Removal},
    utils::normalize_required_name,
};

use super::Engine;

impl Engine {
    pub fn create_tag(&mut self, user: UserId, name: &str) -> ResultEngine<Tag> {
        let name = normalize_required_name(name, "tag")?;
        self.write("create_tag", |conn| {
            ensure_unique_name(conn, user, &name, None)?;
            conn.execute(
                "INSERT INTO tags(user_id, name) VALUES (?1, ?2)",
                params![user, name],
            )?;
            require_owned(conn, user, conn.last_insert_rowid())
        })
    }

    pub fn get_tag(&self, user: UserId, id: TagId) -> ResultEngine<Tag> {
        self.read(|conn| require_owned(conn, user, id))
    }

    pub fn list_tags(&self, user: UserId, include_inactive: bool) -> ResultEngine<Vec<Tag>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, is_active FROM tags
                 WHERE user_id = ?1 AND (?2 OR is_active = 1)
                 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![user, include_inactive], map_row)?;
            rows.map(|row| row.map_err(EngineError::from)).collect()
        })
    }

    pub fn rename_tag(&mut self, user: UserId, id: TagId, name: &str) -> ResultEngine<Tag> {
        let name = normalize_required_name(name, "tag")?;
        self.write("rename_tag", |conn| {
            require_owned(conn, user, id)?;
            ensure_unique_name(conn, user, &name, Some(id))?;
            conn.execute("UPDATE tags SET name = ?1 WHERE id = ?2", params![name, id])?;
            require_owned(conn, user, id)
        })
    }

    /// Soft delete. Existing associations stay as history, but the tag can no
    /// longer be attached.
    pub fn delete_tag(&mut self, user: UserId, id: TagId) -> ResultEngine<()> {
        self.write("delete_tag", |conn| {
            let tag = require_owned(conn, user, id)?;
            if !tag.is_active {
                return Err(EngineError::inactive("tag", id));
            }
            policy::apply_removal(conn, Entity::Tag, id, Removal::Soft)?;
            conn.execute("UPDATE tags SET is_active = 0 WHERE id = ?1", params![id])?;
            info!(user, tag_id = id, "tag deleted");
            Ok(())
        })
    }

    pub fn restore_tag(&mut self, user: UserId, id: TagId) -> ResultEngine<Tag> {
        self.write("restore_tag", |conn| {
            let tag = require_owned(conn, user, id)?;
            if tag.is_active {
                return Err(EngineError::InvalidInput(format!("tag {id} is already active")));
            }
            conn.execute("UPDATE tags SET is_active = 1 WHERE id = ?1", params![id])?;
            require_owned(conn, user, id)
        })
    }

    /// Removes the tag row and, through the cascade policy, every association.
    /// Returns the number of associations dropped.
    pub fn purge_tag(&mut self, user: UserId, id: TagId) -> ResultEngine<usize> {
        self.write("purge_tag", |conn| {
            require_owned(conn, user, id)?;
            let effects = policy::apply_removal(conn, Entity::Tag, id, Removal::Hard)?;
            conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
            info!(user, tag_id = id, dropped = effects.cascaded, "tag purged");
            Ok(effects.cascaded)
        })
    }
}

pub(crate) fn require_owned(conn: &Connection, user: UserId, id: TagId) -> ResultEngine<Tag> {
    conn.query_row(
        "SELECT id, user_id, name, is_active FROM tags WHERE id = ?1 AND user_id = ?2",
        params![id, user],
        map_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("tag", id))
}

pub(crate) fn require_active(conn: &Connection, user: UserId, id: TagId) -> ResultEngine<Tag> {
    let tag = require_owned(conn, user, id)?;
    if !tag.is_active {
        return Err(EngineError::inactive("tag", id));
    }
    Ok(tag)
}

fn ensure_unique_name(
    conn: &Connection,
    user: UserId,
    name: &str,
    except: Option<TagId>,
) -> ResultEngine<()> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE user_id = ?1 AND name = ?2 AND id != ?3)",
        params![user, name, except.unwrap_or(0)],
        |r| r.get(0),
    )?;
    if taken {
        return Err(EngineError::InvalidInput(format!("tag '{name}' already exists")));
    }
    Ok(())
}

pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get(3)?,
    })
}
