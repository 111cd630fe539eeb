// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Budget periods and utilization.
//!
//! A budget caps spending in one expense category. Monthly budgets apply to
//! every calendar month from `start_date` on, yearly ones to every calendar
//! year, until `end_date` (inclusive) or forever. The window used for a query
//! date is the whole month or year containing it, whatever the day of
//! `start_date`. Budgets are advisory: transactions are never refused for
//! exceeding one.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::info;

use crate::{
    error::{EngineError, ResultEngine},
    models::{Budget, BudgetId, BudgetStatus, CategoryId, PeriodType, TransactionType, UserId},
    utils::{checked_total, decimal_column, month_window, validate_amount, year_window},
};

use super::{Engine, categories};

const BUDGET_COLUMNS: &str =
    "id, user_id, category_id, amount, period_type, start_date, end_date, is_active";

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetPatch {
    pub amount: Option<Decimal>,
    pub end_date: Option<Option<NaiveDate>>,
}

/// The concrete date range a budget applies to for one query date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn for_date(period_type: PeriodType, as_of: NaiveDate) -> Self {
        let (start, end) = match period_type {
            PeriodType::Monthly => month_window(as_of),
            PeriodType::Yearly => year_window(as_of),
        };
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Utilization {
    pub budget_id: BudgetId,
    pub category_id: CategoryId,
    pub period_type: PeriodType,
    pub window: PeriodWindow,
    pub limit: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub over_budget: bool,
    pub percentage_used: Decimal,
    pub status: BudgetStatus,
}

/// Totals over every budget covering one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetSummary {
    pub as_of: NaiveDate,
    pub total_budgets: usize,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub total_remaining: Decimal,
    /// Mean of `percentage_used`, rounded to two places.
    pub average_usage: Decimal,
    pub exceeded: usize,
    pub warning: usize,
    pub on_track: usize,
    pub good: usize,
}

impl Engine {
    pub fn create_budget(&mut self, user: UserId, new: NewBudget) -> ResultEngine<Budget> {
        let amount = validate_amount(new.amount, "budget amount")?;
        check_end_date(new.start_date, new.end_date)?;

        self.write("create_budget", |conn| {
            let category = categories::require_visible(conn, user, new.category_id)?;
            if !category.is_active {
                return Err(EngineError::inactive("category", new.category_id));
            }
            if category.r#type != TransactionType::Expense {
                return Err(EngineError::TypeMismatch {
                    expected: TransactionType::Expense,
                    found: category.r#type,
                });
            }
            ensure_no_duplicate(conn, user, new.category_id, new.period_type, new.start_date, None)?;
            conn.execute(
                "INSERT INTO budgets(user_id, category_id, amount, period_type, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user,
                    new.category_id,
                    amount.to_string(),
                    new.period_type,
                    new.start_date,
                    new.end_date
                ],
            )?;
            let id = conn.last_insert_rowid();
            info!(user, budget_id = id, category_id = new.category_id, "budget created");
            require_owned(conn, user, id)
        })
    }

    pub fn get_budget(&self, user: UserId, id: BudgetId) -> ResultEngine<Budget> {
        self.read(|conn| require_owned(conn, user, id))
    }

    pub fn list_budgets(&self, user: UserId, include_inactive: bool) -> ResultEngine<Vec<Budget>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {BUDGET_COLUMNS} FROM budgets
                 WHERE user_id = ?1 AND (?2 OR is_active = 1)
                 ORDER BY category_id, period_type, start_date"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user, include_inactive], map_row)?;
            rows.map(|row| row.map_err(EngineError::from)).collect()
        })
    }

    pub fn update_budget(
        &mut self,
        user: UserId,
        id: BudgetId,
        patch: BudgetPatch,
    ) -> ResultEngine<Budget> {
        let amount = patch
            .amount
            .map(|a| validate_amount(a, "budget amount"))
            .transpose()?;

        self.write("update_budget", |conn| {
            let current = require_owned(conn, user, id)?;
            if !current.is_active {
                return Err(EngineError::inactive("budget", id));
            }
            let end_date = patch.end_date.unwrap_or(current.end_date);
            check_end_date(current.start_date, end_date)?;
            conn.execute(
                "UPDATE budgets SET amount = ?1, end_date = ?2, updated_at = datetime('now')
                 WHERE id = ?3",
                params![amount.unwrap_or(current.amount).to_string(), end_date, id],
            )?;
            require_owned(conn, user, id)
        })
    }

    pub fn delete_budget(&mut self, user: UserId, id: BudgetId) -> ResultEngine<()> {
        self.write("delete_budget", |conn| {
            let current = require_owned(conn, user, id)?;
            if !current.is_active {
                return Err(EngineError::inactive("budget", id));
            }
            set_active(conn, id, false)?;
            info!(user, budget_id = id, "budget deleted");
            Ok(())
        })
    }

    /// Fails with `DuplicatePeriod` if another active budget took its slot meanwhile.
    pub fn restore_budget(&mut self, user: UserId, id: BudgetId) -> ResultEngine<Budget> {
        self.write("restore_budget", |conn| {
            let current = require_owned(conn, user, id)?;
            if current.is_active {
                return Err(EngineError::InvalidInput(format!(
                    "budget {id} is already active"
                )));
            }
            ensure_no_duplicate(
                conn,
                user,
                current.category_id,
                current.period_type,
                current.start_date,
                Some(id),
            )?;
            set_active(conn, id, true)?;
            require_owned(conn, user, id)
        })
    }

    /// The active budget of `category_id` whose lifetime covers `as_of`.
    ///
    /// When several match, the latest `start_date` wins, then monthly over
    /// yearly, then the most recently created.
    pub fn resolve_active_budget(
        &self,
        user: UserId,
        category_id: CategoryId,
        as_of: NaiveDate,
    ) -> ResultEngine<Option<Budget>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {BUDGET_COLUMNS} FROM budgets
                 WHERE user_id = ?1 AND category_id = ?2 AND is_active = 1
                   AND start_date <= ?3 AND (end_date IS NULL OR end_date >= ?3)
                 ORDER BY start_date DESC, period_type = 'monthly' DESC, id DESC
                 LIMIT 1"
            );
            conn.query_row(&sql, params![user, category_id, as_of], map_row)
                .optional()
                .map_err(EngineError::from)
        })
    }

    /// Spending against `budget` in the period window containing `as_of`.
    ///
    /// The budget is reloaded from storage; it must be active and its
    /// lifetime must cover `as_of`. Only active expense transactions count;
    /// income in the same category does not offset spend.
    pub fn compute_utilization(
        &self,
        user: UserId,
        budget: &Budget,
        as_of: NaiveDate,
    ) -> ResultEngine<Utilization> {
        self.read(|conn| {
            let stored = require_owned(conn, user, budget.id)?;
            if !stored.is_active {
                return Err(EngineError::inactive("budget", stored.id));
            }
            if !stored.covers(as_of) {
                return Err(EngineError::InvalidInput(format!(
                    "budget {} does not cover {as_of}",
                    stored.id
                )));
            }
            let window = PeriodWindow::for_date(stored.period_type, as_of);
            let spent = spent_in_window(conn, user, stored.category_id, window)?;
            utilization(&stored, window, spent)
        })
    }

    /// Utilization of every active budget covering `as_of`.
    pub fn budget_status(&self, user: UserId, as_of: NaiveDate) -> ResultEngine<Vec<Utilization>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {BUDGET_COLUMNS} FROM budgets
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY category_id, period_type, start_date"
            );
            let mut stmt = conn.prepare(&sql)?;
            let budgets = stmt
                .query_map(params![user], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            budgets
                .iter()
                .filter(|budget| budget.covers(as_of))
                .map(|budget| -> ResultEngine<Utilization> {
                    let window = PeriodWindow::for_date(budget.period_type, as_of);
                    let spent = spent_in_window(conn, user, budget.category_id, window)?;
                    utilization(budget, window, spent)
                })
                .collect()
        })
    }

    /// Covering budgets that have reached their limit.
    pub fn exceeded_budgets(&self, user: UserId, as_of: NaiveDate) -> ResultEngine<Vec<Utilization>> {
        let mut status = self.budget_status(user, as_of)?;
        status.retain(|u| u.status == BudgetStatus::Exceeded);
        Ok(status)
    }

    /// Covering budgets ordered by percentage used, highest first.
    pub fn category_analysis(&self, user: UserId, as_of: NaiveDate) -> ResultEngine<Vec<Utilization>> {
        let mut status = self.budget_status(user, as_of)?;
        status.sort_by(|a, b| {
            b.percentage_used
                .cmp(&a.percentage_used)
                .then(a.budget_id.cmp(&b.budget_id))
        });
        Ok(status)
    }

    pub fn budget_summary(&self, user: UserId, as_of: NaiveDate) -> ResultEngine<BudgetSummary> {
        let status = self.budget_status(user, as_of)?;
        summarize_status(as_of, &status)
    }
}

fn summarize_status(as_of: NaiveDate, status: &[Utilization]) -> ResultEngine<BudgetSummary> {
    let mut summary = BudgetSummary {
        as_of,
        total_budgets: status.len(),
        total_budgeted: Decimal::ZERO,
        total_spent: Decimal::ZERO,
        total_remaining: Decimal::ZERO,
        average_usage: Decimal::ZERO,
        exceeded: 0,
        warning: 0,
        on_track: 0,
        good: 0,
    };
    let mut usage = Decimal::ZERO;
    for u in status {
        summary.total_budgeted = checked_total(summary.total_budgeted, u.limit)?;
        summary.total_spent = checked_total(summary.total_spent, u.spent)?;
        usage = checked_total(usage, u.percentage_used)?;
        match u.status {
            BudgetStatus::Exceeded => summary.exceeded += 1,
            BudgetStatus::Warning => summary.warning += 1,
            BudgetStatus::OnTrack => summary.on_track += 1,
            BudgetStatus::Good => summary.good += 1,
        }
    }
    summary.total_remaining = summary.total_budgeted - summary.total_spent;
    if !status.is_empty() {
        summary.average_usage = (usage / Decimal::from(status.len()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    }
    Ok(summary)
}

fn utilization(budget: &Budget, window: PeriodWindow, spent: Decimal) -> ResultEngine<Utilization> {
    let percentage_used = if budget.amount.is_zero() {
        Decimal::ZERO
    } else {
        spent
            .checked_div(budget.amount)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| {
                EngineError::InvalidAmount(format!("usage of budget {} overflows", budget.id))
            })?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };
    Ok(Utilization {
        budget_id: budget.id,
        category_id: budget.category_id,
        period_type: budget.period_type,
        window,
        limit: budget.amount,
        spent,
        remaining: budget.amount - spent,
        over_budget: spent > budget.amount,
        percentage_used,
        status: BudgetStatus::from_percentage(percentage_used),
    })
}

fn spent_in_window(
    conn: &Connection,
    user: UserId,
    category_id: CategoryId,
    window: PeriodWindow,
) -> ResultEngine<Decimal> {
    let mut stmt = conn.prepare(
        "SELECT amount FROM transactions
         WHERE user_id = ?1 AND category_id = ?2 AND type = 'expense' AND is_active = 1
           AND transaction_date BETWEEN ?3 AND ?4",
    )?;
    let mut rows = stmt.query(params![user, category_id, window.start, window.end])?;
    let mut spent = Decimal::ZERO;
    while let Some(row) = rows.next()? {
        spent = checked_total(spent, decimal_column(row, 0)?.abs())?;
    }
    Ok(spent)
}

fn check_end_date(start: NaiveDate, end: Option<NaiveDate>) -> ResultEngine<()> {
    match end {
        Some(end) if end < start => Err(EngineError::InvalidInput(format!(
            "end date {end} is before start date {start}"
        ))),
        _ => Ok(()),
    }
}

fn ensure_no_duplicate(
    conn: &Connection,
    user: UserId,
    category_id: CategoryId,
    period_type: PeriodType,
    start_date: NaiveDate,
    except: Option<BudgetId>,
) -> ResultEngine<()> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM budgets
                       WHERE user_id = ?1 AND category_id = ?2 AND period_type = ?3
                         AND start_date = ?4 AND is_active = 1 AND id != ?5)",
        params![user, category_id, period_type, start_date, except.unwrap_or(0)],
        |r| r.get(0),
    )?;
    if taken {
        return Err(EngineError::DuplicatePeriod {
            category_id,
            period_type,
            start_date,
        });
    }
    Ok(())
}

fn require_owned(conn: &Connection, user: UserId, id: BudgetId) -> ResultEngine<Budget> {
    let sql = format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user], map_row)
        .optional()?
        .ok_or_else(|| EngineError::not_found("budget", id))
}

fn set_active(conn: &Connection, id: BudgetId, active: bool) -> ResultEngine<()> {
    conn.execute(
        "UPDATE budgets SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    Ok(())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        amount: decimal_column(row, 3)?,
        period_type: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        is_active: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_window_ignores_start_day() {
        let window = PeriodWindow::for_date(PeriodType::Monthly, date(2024, 3, 10));
        assert_eq!(window.start, date(2024, 3, 1));
        assert_eq!(window.end, date(2024, 3, 31));
        assert!(window.contains(date(2024, 3, 31)));
        assert!(!window.contains(date(2024, 4, 1)));
    }

    #[test]
    fn percentage_is_rounded_to_cents() {
        let budget = Budget {
            id: 1,
            user_id: 1,
            category_id: 1,
            amount: Decimal::new(300, 0),
            period_type: PeriodType::Yearly,
            start_date: date(2024, 1, 1),
            end_date: None,
            is_active: true,
        };
        let window = PeriodWindow::for_date(PeriodType::Yearly, date(2024, 6, 1));
        let u = utilization(&budget, window, Decimal::new(100, 0)).unwrap();
        assert_eq!(u.percentage_used, Decimal::new(3333, 2));
        assert_eq!(u.remaining, Decimal::new(200, 0));
        assert!(!u.over_budget);
        assert_eq!(u.status, BudgetStatus::Good);
    }

    #[test]
    fn status_buckets_switch_at_fifty_eighty_and_hundred() {
        let cases = [
            ("0", BudgetStatus::Good),
            ("49.99", BudgetStatus::Good),
            ("50", BudgetStatus::OnTrack),
            ("79.99", BudgetStatus::OnTrack),
            ("80", BudgetStatus::Warning),
            ("99.99", BudgetStatus::Warning),
            ("100", BudgetStatus::Exceeded),
            ("250", BudgetStatus::Exceeded),
        ];
        for (pct, expected) in cases {
            let pct: Decimal = pct.parse().unwrap();
            assert_eq!(BudgetStatus::from_percentage(pct), expected, "{pct}");
        }
    }

    #[test]
    fn spend_too_large_to_express_as_percentage_is_an_error() {
        let budget = Budget {
            id: 9,
            user_id: 1,
            category_id: 1,
            amount: Decimal::new(1, 2),
            period_type: PeriodType::Monthly,
            start_date: date(2024, 1, 1),
            end_date: None,
            is_active: true,
        };
        let window = PeriodWindow::for_date(PeriodType::Monthly, date(2024, 1, 1));
        assert!(matches!(
            utilization(&budget, window, Decimal::MAX),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn summary_totals_and_average_usage() {
        let window = PeriodWindow::for_date(PeriodType::Monthly, date(2024, 5, 1));
        let budget = |id, amount| Budget {
            id,
            user_id: 1,
            category_id: id,
            amount: Decimal::new(amount, 0),
            period_type: PeriodType::Monthly,
            start_date: date(2024, 1, 1),
            end_date: None,
            is_active: true,
        };
        let rows = vec![
            utilization(&budget(1, 100), window, Decimal::new(120, 0)).unwrap(),
            utilization(&budget(2, 200), window, Decimal::new(170, 0)).unwrap(),
            utilization(&budget(3, 300), window, Decimal::new(30, 0)).unwrap(),
        ];
        let summary = summarize_status(date(2024, 5, 1), &rows).unwrap();
        assert_eq!(summary.total_budgets, 3);
        assert_eq!(summary.total_budgeted, Decimal::new(600, 0));
        assert_eq!(summary.total_spent, Decimal::new(320, 0));
        assert_eq!(summary.total_remaining, Decimal::new(280, 0));
        // (120 + 85 + 10) / 3
        assert_eq!(summary.average_usage, Decimal::new(7167, 2));
        assert_eq!((summary.exceeded, summary.warning, summary.on_track, summary.good), (1, 1, 0, 1));

        let empty = summarize_status(date(2024, 5, 1), &[]).unwrap();
        assert_eq!(empty.average_usage, Decimal::ZERO);
        assert_eq!(empty.total_budgets, 0);
    }
}
