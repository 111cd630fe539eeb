// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::ArgMatches;

use crate::utils::parse_date;

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod doctor;
pub mod receipts;
pub mod reports;
pub mod tags;
pub mod transactions;

pub(crate) fn required<'a>(m: &'a ArgMatches, name: &str) -> Result<&'a str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("Missing required argument '{}'", name))
}

pub(crate) fn required_id(m: &ArgMatches, name: &str) -> Result<i64> {
    m.get_one::<i64>(name)
        .copied()
        .with_context(|| format!("Missing required argument '{}'", name))
}

pub(crate) fn optional<'a>(m: &'a ArgMatches, name: &str) -> Option<&'a str> {
    m.get_one::<String>(name).map(String::as_str)
}

pub(crate) fn optional_date(m: &ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    optional(m, name).map(parse_date).transpose()
}

pub(crate) fn date_or_today(m: &ArgMatches, name: &str) -> Result<NaiveDate> {
    Ok(optional_date(m, name)?.unwrap_or_else(|| Local::now().date_naive()))
}
