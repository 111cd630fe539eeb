// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use serde::Serialize;

use super::{date_or_today, optional, optional_date, required, required_id};
use crate::engine::{Engine, NewTransaction, TransactionFilter, TransactionPatch};
use crate::models::{Tag, Transaction, UserId};
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(engine, user, sub)?,
        Some(("list", sub)) => list(engine, user, sub)?,
        Some(("show", sub)) => show(engine, user, sub)?,
        Some(("edit", sub)) => edit(engine, user, sub)?,
        Some(("rm", sub)) => {
            let id = required_id(sub, "id")?;
            engine.delete_transaction(user, id)?;
            println!("Deleted transaction #{}", id);
        }
        Some(("restore", sub)) => {
            let tx = engine.restore_transaction(user, required_id(sub, "id")?)?;
            println!("Restored transaction #{} ({} {})", tx.id, tx.r#type, tx.amount);
        }
        Some(("tag", sub)) => {
            let (id, tag) = (required_id(sub, "id")?, required_id(sub, "tag")?);
            if engine.attach_tag(user, id, tag)? {
                println!("Tagged transaction #{} with tag #{}", id, tag);
            } else {
                println!("Transaction #{} already has tag #{}", id, tag);
            }
        }
        Some(("untag", sub)) => {
            let (id, tag) = (required_id(sub, "id")?, required_id(sub, "tag")?);
            if engine.detach_tag(user, id, tag)? {
                println!("Removed tag #{} from transaction #{}", tag, id);
            } else {
                println!("Transaction #{} does not have tag #{}", id, tag);
            }
        }
        _ => {}
    }
    Ok(())
}

fn add(engine: &mut Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        account_id: sub.get_one::<i64>("account").copied(),
        category_id: required_id(sub, "category")?,
        r#type: required(sub, "type")?.parse()?,
        amount: parse_decimal(required(sub, "amount")?)?,
        description: optional(sub, "description").unwrap_or_default().to_string(),
        notes: optional(sub, "notes").map(str::to_string),
        transaction_date: date_or_today(sub, "date")?,
    };
    let tx = engine.create_transaction(user, new)?;
    match tx.account_id {
        Some(account_id) => {
            let balance = engine.account_balance(user, account_id)?;
            println!(
                "Recorded #{} {} {} on {} (account #{} balance: {})",
                tx.id, tx.r#type, tx.amount, tx.transaction_date, account_id, balance
            );
        }
        None => println!(
            "Recorded #{} {} {} on {}",
            tx.id, tx.r#type, tx.amount, tx.transaction_date
        ),
    }
    Ok(())
}

fn list(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let filter = TransactionFilter {
        r#type: optional(sub, "type").map(str::parse).transpose()?,
        category_id: sub.get_one::<i64>("category").copied(),
        account_id: sub.get_one::<i64>("account").copied(),
        date_from: optional_date(sub, "from")?,
        date_to: optional_date(sub, "to")?,
        amount_min: optional(sub, "min").map(parse_decimal).transpose()?,
        amount_max: optional(sub, "max").map(parse_decimal).transpose()?,
        search: optional(sub, "search").map(str::to_string),
        include_inactive: sub.get_flag("all"),
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let data = engine.list_transactions(user, &filter)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data.iter().map(row).collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Amount", "Account", "Category", "Description", "Active"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct TransactionDetail {
    #[serde(flatten)]
    transaction: Transaction,
    tags: Vec<Tag>,
}

fn show(engine: &Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub, "id")?;
    let detail = TransactionDetail {
        transaction: engine.get_transaction(user, id)?,
        tags: engine.transaction_tags(user, id)?,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        let tags: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
        let mut cells = row(&detail.transaction);
        cells.push(tags.join(", "));
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Amount", "Account", "Category", "Description", "Active", "Tags"],
                vec![cells],
            )
        );
    }
    Ok(())
}

fn edit(engine: &mut Engine, user: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let account_id = if sub.get_flag("no-account") {
        Some(None)
    } else {
        sub.get_one::<i64>("account").map(|id| Some(*id))
    };
    let patch = TransactionPatch {
        account_id,
        category_id: sub.get_one::<i64>("category").copied(),
        r#type: optional(sub, "type").map(str::parse).transpose()?,
        amount: optional(sub, "amount").map(parse_decimal).transpose()?,
        description: optional(sub, "description").map(str::to_string),
        notes: optional(sub, "notes").map(|n| Some(n.to_string())),
        transaction_date: optional_date(sub, "date")?,
    };
    let tx = engine.update_transaction(user, required_id(sub, "id")?, patch)?;
    println!("Updated transaction #{} ({} {})", tx.id, tx.r#type, tx.amount);
    Ok(())
}

fn row(t: &Transaction) -> Vec<String> {
    vec![
        t.id.to_string(),
        t.transaction_date.to_string(),
        t.r#type.to_string(),
        format!("{:.2}", t.amount),
        t.account_id.map(|id| id.to_string()).unwrap_or_default(),
        t.category_id.to_string(),
        t.description.clone(),
        if t.is_active { "yes".into() } else { "no".into() },
    ]
}
