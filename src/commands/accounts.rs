// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{optional, required, required_id};
use crate::engine::{AccountPatch, Engine, NewAccount};
use crate::models::{AccountType, UserId};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required(sub, "name")?;
            let r#type: AccountType = required(sub, "type")?.parse()?;
            let account = engine.create_account(
                user,
                NewAccount {
                    name: name.to_string(),
                    r#type,
                    currency: optional(sub, "currency").map(str::to_string),
                    description: optional(sub, "description").map(str::to_string),
                },
            )?;
            println!(
                "Added account #{} '{}' ({}, {})",
                account.id, account.name, account.r#type, account.currency
            );
        }
        Some(("list", sub)) => {
            let accounts = engine.list_accounts(user, sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
                let rows = accounts
                    .iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.name.clone(),
                            a.r#type.to_string(),
                            fmt_money(&a.balance, &a.currency),
                            if a.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Type", "Balance", "Active"], rows)
                );
            }
        }
        Some(("update", sub)) => {
            let id = required_id(sub, "id")?;
            let patch = AccountPatch {
                name: optional(sub, "name").map(str::to_string),
                r#type: optional(sub, "type").map(str::parse).transpose()?,
                description: optional(sub, "description").map(|d| Some(d.to_string())),
            };
            let account = engine.update_account(user, id, patch)?;
            println!("Updated account #{} '{}'", account.id, account.name);
        }
        Some(("deactivate", sub)) => {
            let id = required_id(sub, "id")?;
            engine.deactivate_account(user, id)?;
            println!("Deactivated account #{}", id);
        }
        Some(("restore", sub)) => {
            let account = engine.restore_account(user, required_id(sub, "id")?)?;
            println!("Restored account #{} '{}'", account.id, account.name);
        }
        Some(("rm", sub)) => {
            let deleted = engine.delete_account(user, required_id(sub, "id")?)?;
            println!(
                "Removed account #{} ({} transaction(s) unassigned, balance {} discarded)",
                deleted.account_id, deleted.detached_transactions, deleted.discarded_balance
            );
        }
        Some(("summary", sub)) => {
            let summary = engine.account_summary(user)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
                let rows = summary
                    .iter()
                    .map(|s| {
                        vec![
                            s.r#type.to_string(),
                            s.account_count.to_string(),
                            format!("{:.2}", s.total_balance.round_dp(2)),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Type", "Accounts", "Total"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}
