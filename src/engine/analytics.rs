// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-side aggregation over active transactions.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, btree_map},
    fmt,
};

use chrono::{Datelike, NaiveDate};
use rusqlite::params;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::{
    error::{EngineError, ResultEngine},
    models::{CategoryId, TransactionType, UserId},
    utils::{checked_total, decimal_column},
};

use super::Engine;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ResultEngine<Self> {
        if end < start {
            return Err(EngineError::InvalidInput(format!(
                "date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Category,
    Type,
    Month,
}

impl std::str::FromStr for GroupBy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "type" => Ok(Self::Type),
            "month" => Ok(Self::Month),
            other => Err(EngineError::InvalidInput(format!("invalid grouping '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    Category { id: CategoryId, name: String },
    Type { r#type: TransactionType },
    Month { year: i32, month: u32 },
}

impl GroupKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Category { .. } => 0,
            Self::Type { .. } => 1,
            Self::Month { .. } => 2,
        }
    }
}

/// Categories sort by name, types alphabetically, months chronologically.
impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Category { id: a, name: an }, Self::Category { id: b, name: bn }) => {
                an.cmp(bn).then(a.cmp(b))
            }
            (Self::Type { r#type: a }, Self::Type { r#type: b }) => a.as_str().cmp(b.as_str()),
            (Self::Month { year: ay, month: am }, Self::Month { year: by, month: bm }) => {
                (ay, am).cmp(&(by, bm))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category { name, .. } => f.write_str(name),
            Self::Type { r#type } => write!(f, "{}", r#type),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    income: Decimal,
    expense: Decimal,
    count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub group_key: GroupKey,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_amount: Decimal,
    pub transaction_count: u64,
}

/// Aggregated totals per group key.
///
/// The totals are computed once from a single snapshot; [`Summary::iter`]
/// builds rows lazily and can be called any number of times.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    groups: BTreeMap<GroupKey, Totals>,
}

impl Summary {
    pub fn iter(&self) -> SummaryIter<'_> {
        SummaryIter {
            inner: self.groups.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct SummaryIter<'a> {
    inner: btree_map::Iter<'a, GroupKey, Totals>,
}

impl Iterator for SummaryIter<'_> {
    type Item = SummaryRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, totals)| SummaryRow {
            group_key: key.clone(),
            total_income: totals.income,
            total_expense: totals.expense,
            net_amount: totals.income - totals.expense,
            transaction_count: totals.count,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a Summary {
    type Item = SummaryRow;
    type IntoIter = SummaryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_amount: Decimal,
    pub transaction_count: u64,
    pub income_count: u64,
    pub expense_count: u64,
    /// Mean amount over all transactions, zero when there are none.
    pub average_transaction: Decimal,
}

struct Entry {
    category_id: CategoryId,
    category_name: String,
    kind: TransactionType,
    amount: Decimal,
    date: NaiveDate,
}

impl Engine {
    pub fn summarize(
        &self,
        user: UserId,
        range: DateRange,
        group_by: GroupBy,
    ) -> ResultEngine<Summary> {
        let entries = self.read(|conn| load_entries(conn, user, range))?;
        let mut groups: BTreeMap<GroupKey, Totals> = BTreeMap::new();
        for entry in entries {
            let key = match group_by {
                GroupBy::Category => GroupKey::Category {
                    id: entry.category_id,
                    name: entry.category_name,
                },
                GroupBy::Type => GroupKey::Type { r#type: entry.kind },
                GroupBy::Month => GroupKey::Month {
                    year: entry.date.year(),
                    month: entry.date.month(),
                },
            };
            let totals = groups.entry(key).or_default();
            match entry.kind {
                TransactionType::Income => {
                    totals.income = checked_total(totals.income, entry.amount)?
                }
                TransactionType::Expense => {
                    totals.expense = checked_total(totals.expense, entry.amount)?
                }
            }
            totals.count += 1;
        }
        Ok(Summary { groups })
    }

    pub fn transaction_stats(&self, user: UserId, range: DateRange) -> ResultEngine<TransactionStats> {
        let entries = self.read(|conn| load_entries(conn, user, range))?;
        let mut totals = Totals::default();
        let (mut income_count, mut expense_count) = (0u64, 0u64);
        for entry in &entries {
            match entry.kind {
                TransactionType::Income => {
                    totals.income = checked_total(totals.income, entry.amount)?;
                    income_count += 1;
                }
                TransactionType::Expense => {
                    totals.expense = checked_total(totals.expense, entry.amount)?;
                    expense_count += 1;
                }
            }
            totals.count += 1;
        }
        let average_transaction = if totals.count == 0 {
            Decimal::ZERO
        } else {
            (checked_total(totals.income, totals.expense)? / Decimal::from(totals.count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        Ok(TransactionStats {
            total_income: totals.income,
            total_expense: totals.expense,
            net_amount: totals.income - totals.expense,
            transaction_count: totals.count,
            income_count,
            expense_count,
            average_transaction,
        })
    }
}

fn load_entries(
    conn: &rusqlite::Connection,
    user: UserId,
    range: DateRange,
) -> ResultEngine<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "SELECT t.category_id, c.name, t.type, t.amount, t.transaction_date
         FROM transactions t JOIN categories c ON c.id = t.category_id
         WHERE t.user_id = ?1 AND t.is_active = 1
           AND t.transaction_date BETWEEN ?2 AND ?3",
    )?;
    let rows = stmt.query_map(params![user, range.start, range.end], |row| {
        Ok(Entry {
            category_id: row.get(0)?,
            category_name: row.get(1)?,
            kind: row.get(2)?,
            amount: decimal_column(row, 3)?,
            date: row.get(4)?,
        })
    })?;
    rows.map(|row| row.map_err(EngineError::from)).collect()
}
