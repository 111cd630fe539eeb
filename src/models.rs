// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Identity supplied by the auth layer. Every engine call is scoped to it.
pub type UserId = i64;
pub type AccountId = i64;
pub type CategoryId = i64;
pub type TransactionId = i64;
pub type TagId = i64;
pub type BudgetId = i64;
pub type ReceiptId = i64;

/// Stores an enum as its lowercase text label.
macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(EngineError::InvalidInput(format!(
                        "invalid {}: '{other}'",
                        $label
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|err: EngineError| FromSqlError::Other(Box::new(err)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

text_enum!(TransactionType, "transaction type", {
    Income => "income",
    Expense => "expense",
});

impl TransactionType {
    /// Balance contribution of `amount` for this type: income adds, expense subtracts.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    CreditCard,
    Investment,
    Other,
}

text_enum!(AccountType, "account type", {
    Cash => "cash",
    Bank => "bank",
    CreditCard => "credit_card",
    Investment => "investment",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Monthly,
    Yearly,
}

text_enum!(PeriodType, "period type", {
    Monthly => "monthly",
    Yearly => "yearly",
});

/// Where a budget stands within its current window, by percentage used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Good,
    OnTrack,
    Warning,
    Exceeded,
}

text_enum!(BudgetStatus, "budget status", {
    Good => "good",
    OnTrack => "on_track",
    Warning => "warning",
    Exceeded => "exceeded",
});

impl BudgetStatus {
    /// Exceeded from 100%, warning from 80%, on track from 50%.
    pub fn from_percentage(percentage_used: Decimal) -> Self {
        if percentage_used >= Decimal::ONE_HUNDRED {
            Self::Exceeded
        } else if percentage_used >= Decimal::from(80) {
            Self::Warning
        } else if percentage_used >= Decimal::from(50) {
            Self::OnTrack
        } else {
            Self::Good
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub name: String,
    pub r#type: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Bumped on every balance write; guards the read-modify-write of `balance`.
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// `None` for system categories shared by every user.
    pub user_id: Option<UserId>,
    pub name: String,
    pub r#type: TransactionType,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
}

impl Category {
    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
    pub category_id: CategoryId,
    pub r#type: TransactionType,
    /// Always positive; direction comes from `type`.
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub transaction_date: NaiveDate,
    pub is_active: bool,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.r#type.signed(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    /// Spending limit per period.
    pub amount: Decimal,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    /// `None` means the budget recurs indefinitely.
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl Budget {
    /// Whether `date` falls inside the budget's lifetime (both ends inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub transaction_id: TransactionId,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub is_active: bool,
}
