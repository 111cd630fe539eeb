// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{date_or_today, optional, optional_date, required, required_id};
use crate::engine::{BudgetPatch, Engine, NewBudget, Utilization};
use crate::models::UserId;
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(engine, user, sub)?,
        Some(("list", sub)) => list(engine, user, sub)?,
        Some(("update", sub)) => {
            let end_date = if sub.get_flag("open-ended") {
                Some(None)
            } else {
                optional_date(sub, "end")?.map(Some)
            };
            let patch = BudgetPatch {
                amount: optional(sub, "amount").map(parse_decimal).transpose()?,
                end_date,
            };
            let budget = engine.update_budget(user, required_id(sub, "id")?, patch)?;
            println!("Updated budget #{} (limit {})", budget.id, budget.amount);
        }
        Some(("status", sub)) => {
            let as_of = date_or_today(sub, "date")?;
            let status = engine.budget_status(user, as_of)?;
            print_utilization(sub, &status)?;
        }
        Some(("exceeded", sub)) => {
            let as_of = date_or_today(sub, "date")?;
            print_utilization(sub, &engine.exceeded_budgets(user, as_of)?)?;
        }
        Some(("analysis", sub)) => {
            let as_of = date_or_today(sub, "date")?;
            print_utilization(sub, &engine.category_analysis(user, as_of)?)?;
        }
        Some(("summary", sub)) => summary(engine, user, sub)?,
        Some(("show", sub)) => {
            let category_id = required_id(sub, "category")?;
            let as_of = date_or_today(sub, "date")?;
            match engine.resolve_active_budget(user, category_id, as_of)? {
                Some(budget) => {
                    let utilization = engine.compute_utilization(user, &budget, as_of)?;
                    print_utilization(sub, &[utilization])?;
                }
                None => println!("No active budget for category #{} on {}", category_id, as_of),
            }
        }
        Some(("rm", sub)) => {
            let id = required_id(sub, "id")?;
            engine.delete_budget(user, id)?;
            println!("Deleted budget #{}", id);
        }
        Some(("restore", sub)) => {
            let budget = engine.restore_budget(user, required_id(sub, "id")?)?;
            println!("Restored budget #{}", budget.id);
        }
        _ => {}
    }
    Ok(())
}

fn add(engine: &mut Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewBudget {
        category_id: required_id(sub, "category")?,
        amount: parse_decimal(required(sub, "amount")?)?,
        period_type: required(sub, "period")?.parse()?,
        start_date: parse_date(required(sub, "start")?)?,
        end_date: optional_date(sub, "end")?,
    };
    let budget = engine.create_budget(user, new)?;
    println!(
        "Budget #{} set for category #{}: {} {} from {}",
        budget.id, budget.category_id, budget.amount, budget.period_type, budget.start_date
    );
    Ok(())
}

fn list(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let budgets = engine.list_budgets(user, sub.get_flag("all"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budgets)? {
        let rows = budgets
            .iter()
            .map(|b| {
                vec![
                    b.id.to_string(),
                    b.category_id.to_string(),
                    b.period_type.to_string(),
                    format!("{:.2}", b.amount),
                    b.start_date.to_string(),
                    b.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                    if b.is_active { "yes".into() } else { "no".into() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Category", "Period", "Limit", "Start", "End", "Active"],
                rows
            )
        );
    }
    Ok(())
}

fn summary(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let as_of = date_or_today(sub, "date")?;
    let summary = engine.budget_summary(user, as_of)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Budgets".into(), summary.total_budgets.to_string()],
        vec!["Budgeted".into(), format!("{:.2}", summary.total_budgeted)],
        vec!["Spent".into(), format!("{:.2}", summary.total_spent)],
        vec!["Remaining".into(), format!("{:.2}", summary.total_remaining)],
        vec!["Average usage".into(), format!("{}%", summary.average_usage)],
        vec!["Exceeded".into(), summary.exceeded.to_string()],
        vec!["Warning".into(), summary.warning.to_string()],
        vec!["On track".into(), summary.on_track.to_string()],
        vec!["Good".into(), summary.good.to_string()],
    ];
    println!("Budgets on {}", as_of);
    println!("{}", pretty_table(&["Metric", "Value"], rows));
    Ok(())
}

fn print_utilization(sub: &clap::ArgMatches, data: &[Utilization]) -> Result<()> {
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|u| {
            vec![
                u.budget_id.to_string(),
                u.category_id.to_string(),
                format!("{} .. {}", u.window.start, u.window.end),
                format!("{:.2}", u.limit),
                format!("{:.2}", u.spent),
                format!("{:.2}", u.remaining),
                format!("{}%", u.percentage_used),
                u.status.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Budget", "Category", "Window", "Limit", "Spent", "Remaining", "Used", "Status"],
            rows
        )
    );
    Ok(())
}
