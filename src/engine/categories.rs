// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::{
    error::{EngineError, ResultEngine},
    models::{Category, CategoryId, TransactionType, UserId},
    policy::{self, Entity, Removal},
    utils::{normalize_optional_text, normalize_required_name},
};

use super::Engine;

const CATEGORY_COLUMNS: &str = "id, user_id, name, type, icon, color, is_active";

/// Shared categories every user can book against.
const SYSTEM_CATEGORIES: &[(&str, TransactionType, &str, &str)] = &[
    ("Salary", TransactionType::Income, "briefcase", "#4CAF50"),
    ("Freelance", TransactionType::Income, "laptop", "#8BC34A"),
    ("Investment", TransactionType::Income, "trending-up", "#009688"),
    ("Gift", TransactionType::Income, "gift", "#00BCD4"),
    ("Business", TransactionType::Income, "briefcase", "#03A9F4"),
    ("Other Income", TransactionType::Income, "plus-circle", "#2196F3"),
    ("Food & Dining", TransactionType::Expense, "coffee", "#F44336"),
    ("Transportation", TransactionType::Expense, "car", "#E91E63"),
    ("Housing", TransactionType::Expense, "home", "#9C27B0"),
    ("Utilities", TransactionType::Expense, "zap", "#673AB7"),
    ("Healthcare", TransactionType::Expense, "heart", "#3F51B5"),
    ("Entertainment", TransactionType::Expense, "film", "#FF5722"),
    ("Shopping", TransactionType::Expense, "shopping-bag", "#FF9800"),
    ("Education", TransactionType::Expense, "book", "#FFC107"),
    ("Personal Care", TransactionType::Expense, "user", "#FFEB3B"),
    ("Insurance", TransactionType::Expense, "shield", "#CDDC39"),
    ("Debt Payment", TransactionType::Expense, "credit-card", "#795548"),
    ("Other Expense", TransactionType::Expense, "more-horizontal", "#607D8B"),
];

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub r#type: TransactionType,
    pub icon: Option<String>,
    /// `#RRGGBB`
    pub color: Option<String>,
}

/// The type of a category never changes once it has been created.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

impl Engine {
    pub fn create_category(&mut self, user: UserId, new: NewCategory) -> ResultEngine<Category> {
        let name = normalize_required_name(&new.name, "category")?;
        let icon = normalize_optional_text(new.icon.as_deref());
        let color = validate_color(new.color.as_deref())?;

        self.write("create_category", |conn| {
            ensure_unique_name(conn, user, &name, new.r#type, None)?;
            conn.execute(
                "INSERT INTO categories(user_id, name, type, icon, color) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user, name, new.r#type, icon, color],
            )?;
            let id = conn.last_insert_rowid();
            info!(user, category_id = id, "category created");
            require_visible(conn, user, id)
        })
    }

    /// Inserts the default system categories that are missing; returns how many were added.
    pub fn seed_system_categories(&mut self) -> ResultEngine<usize> {
        self.write("seed_system_categories", |conn| {
            let mut created = 0;
            for (name, kind, icon, color) in SYSTEM_CATEGORIES {
                created += conn.execute(
                    "INSERT INTO categories(user_id, name, type, icon, color)
                     SELECT NULL, ?1, ?2, ?3, ?4
                     WHERE NOT EXISTS (
                         SELECT 1 FROM categories WHERE user_id IS NULL AND name = ?1 AND type = ?2
                     )",
                    params![name, kind, icon, color],
                )?;
            }
            info!(created, "system categories seeded");
            Ok(created)
        })
    }

    pub fn get_category(&self, user: UserId, id: CategoryId) -> ResultEngine<Category> {
        self.read(|conn| require_visible(conn, user, id))
    }

    /// System categories plus the user's own, system ones first.
    pub fn list_categories(
        &self,
        user: UserId,
        kind: Option<TransactionType>,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Category>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories
                 WHERE (user_id IS NULL OR user_id = ?1)
                   AND (?2 IS NULL OR type = ?2)
                   AND (?3 OR is_active = 1)
                 ORDER BY user_id IS NOT NULL, type, name, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user, kind, include_inactive], map_row)?;
            rows.map(|row| row.map_err(EngineError::from)).collect()
        })
    }

    pub fn update_category(
        &mut self,
        user: UserId,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> ResultEngine<Category> {
        let name = patch
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "category"))
            .transpose()?;
        let color = match &patch.color {
            Some(c) => Some(validate_color(c.as_deref())?),
            None => None,
        };

        self.write("update_category", |conn| {
            let current = require_owned(conn, user, id)?;
            let name = name.clone().unwrap_or(current.name);
            ensure_unique_name(conn, user, &name, current.r#type, Some(id))?;
            let icon = match &patch.icon {
                Some(icon) => normalize_optional_text(icon.as_deref()),
                None => current.icon,
            };
            let color = color.clone().unwrap_or(current.color);
            conn.execute(
                "UPDATE categories SET name = ?1, icon = ?2, color = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                params![name, icon, color, id],
            )?;
            require_owned(conn, user, id)
        })
    }

    /// Soft-deletes a user category. Refused while any transaction, active or
    /// not, or any budget still points at it.
    pub fn delete_category(&mut self, user: UserId, id: CategoryId) -> ResultEngine<()> {
        self.write("delete_category", |conn| {
            let current = require_owned(conn, user, id)?;
            if !current.is_active {
                return Err(EngineError::inactive("category", id));
            }
            policy::apply_removal(conn, Entity::Category, id, Removal::Soft)?;
            set_active(conn, id, false)?;
            info!(user, category_id = id, "category deleted");
            Ok(())
        })
    }

    pub fn restore_category(&mut self, user: UserId, id: CategoryId) -> ResultEngine<Category> {
        self.write("restore_category", |conn| {
            let current = require_owned(conn, user, id)?;
            if current.is_active {
                return Err(EngineError::InvalidInput(format!(
                    "category {id} is already active"
                )));
            }
            set_active(conn, id, true)?;
            require_owned(conn, user, id)
        })
    }
}

/// A category the user may book against: a system one or their own.
pub(crate) fn require_visible(conn: &Connection, user: UserId, id: CategoryId) -> ResultEngine<Category> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1 AND (user_id IS NULL OR user_id = ?2)"
    );
    conn.query_row(&sql, params![id, user], map_row)
        .optional()?
        .ok_or_else(|| EngineError::not_found("category", id))
}

/// A category the user may edit. System categories are read-only.
fn require_owned(conn: &Connection, user: UserId, id: CategoryId) -> ResultEngine<Category> {
    let category = require_visible(conn, user, id)?;
    if category.is_system() {
        return Err(EngineError::not_found("category", id));
    }
    Ok(category)
}

fn ensure_unique_name(
    conn: &Connection,
    user: UserId,
    name: &str,
    kind: TransactionType,
    except: Option<CategoryId>,
) -> ResultEngine<()> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories
                       WHERE user_id = ?1 AND name = ?2 AND type = ?3 AND id != ?4)",
        params![user, name, kind, except.unwrap_or(0)],
        |r| r.get(0),
    )?;
    if taken {
        return Err(EngineError::InvalidInput(format!(
            "{kind} category '{name}' already exists"
        )));
    }
    Ok(())
}

fn set_active(conn: &Connection, id: CategoryId, active: bool) -> ResultEngine<()> {
    conn.execute(
        "UPDATE categories SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    Ok(())
}

fn validate_color(color: Option<&str>) -> ResultEngine<Option<String>> {
    let Some(color) = normalize_optional_text(color) else {
        return Ok(None);
    };
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::InvalidInput(format!(
            "invalid color '{color}', expected #RRGGBB"
        )));
    }
    Ok(Some(color.to_uppercase()))
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        r#type: row.get(3)?,
        icon: row.get(4)?,
        color: row.get(5)?,
        is_active: row.get(6)?,
    })
}
