// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{optional, required, required_id};
use crate::engine::{CategoryPatch, Engine, NewCategory};
use crate::models::{TransactionType, UserId};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let category = engine.create_category(
                user,
                NewCategory {
                    name: required(sub, "name")?.to_string(),
                    r#type: required(sub, "type")?.parse()?,
                    icon: optional(sub, "icon").map(str::to_string),
                    color: optional(sub, "color").map(str::to_string),
                },
            )?;
            println!(
                "Added category #{} '{}' ({})",
                category.id, category.name, category.r#type
            );
        }
        Some(("list", sub)) => {
            let kind: Option<TransactionType> = optional(sub, "type").map(str::parse).transpose()?;
            let categories = engine.list_categories(user, kind, sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &categories)? {
                let rows = categories
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name.clone(),
                            c.r#type.to_string(),
                            if c.is_system() { "system".into() } else { "own".into() },
                            c.color.clone().unwrap_or_default(),
                            if c.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Type", "Scope", "Color", "Active"], rows)
                );
            }
        }
        Some(("update", sub)) => {
            let patch = CategoryPatch {
                name: optional(sub, "name").map(str::to_string),
                icon: optional(sub, "icon").map(|v| Some(v.to_string())),
                color: optional(sub, "color").map(|v| Some(v.to_string())),
            };
            let category = engine.update_category(user, required_id(sub, "id")?, patch)?;
            println!("Updated category #{} '{}'", category.id, category.name);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub, "id")?;
            engine.delete_category(user, id)?;
            println!("Deleted category #{}", id);
        }
        Some(("restore", sub)) => {
            let category = engine.restore_category(user, required_id(sub, "id")?)?;
            println!("Restored category #{} '{}'", category.id, category.name);
        }
        Some(("seed", _)) => {
            let created = engine.seed_system_categories()?;
            println!("Seeded {} system categories", created);
        }
        _ => {}
    }
    Ok(())
}
