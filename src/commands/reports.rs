// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::required;
use crate::engine::{DateRange, Engine, GroupBy, SummaryRow};
use crate::models::UserId;
use crate::utils::{maybe_print_json, parse_date, pretty_table};

pub fn handle(engine: &Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(engine, user, sub)?,
        Some(("stats", sub)) => stats(engine, user, sub)?,
        _ => {}
    }
    Ok(())
}

fn range(sub: &clap::ArgMatches) -> Result<DateRange> {
    let start = parse_date(required(sub, "from")?)?;
    let end = parse_date(required(sub, "to")?)?;
    Ok(DateRange::new(start, end)?)
}

fn summary(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let group_by: GroupBy = required(sub, "by")?.parse()?;
    let summary = engine.summarize(user, range(sub)?, group_by)?;
    let rows: Vec<SummaryRow> = summary.iter().collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows
            .iter()
            .map(|r| {
                vec![
                    r.group_key.to_string(),
                    format!("{:.2}", r.total_income),
                    format!("{:.2}", r.total_expense),
                    format!("{:.2}", r.net_amount),
                    r.transaction_count.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Group", "Income", "Expense", "Net", "Count"], data)
        );
    }
    Ok(())
}

fn stats(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let stats = engine.transaction_stats(user, range(sub)?)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &stats)? {
        let data = vec![
            vec!["Income".into(), format!("{:.2}", stats.total_income), stats.income_count.to_string()],
            vec!["Expense".into(), format!("{:.2}", stats.total_expense), stats.expense_count.to_string()],
            vec!["Net".into(), format!("{:.2}", stats.net_amount), stats.transaction_count.to_string()],
            vec!["Average".into(), format!("{:.2}", stats.average_transaction), String::new()],
        ];
        println!("{}", pretty_table(&["Metric", "Amount", "Count"], data));
    }
    Ok(())
}
