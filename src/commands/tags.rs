// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{required, required_id};
use crate::engine::Engine;
use crate::models::UserId;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let tag = engine.create_tag(user, required(sub, "name")?)?;
            println!("Added tag #{} '{}'", tag.id, tag.name);
        }
        Some(("list", sub)) => {
            let tags = engine.list_tags(user, sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tags)? {
                let rows = tags
                    .iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            t.name.clone(),
                            if t.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Active"], rows));
            }
        }
        Some(("rename", sub)) => {
            let tag = engine.rename_tag(user, required_id(sub, "id")?, required(sub, "name")?)?;
            println!("Renamed tag #{} to '{}'", tag.id, tag.name);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub, "id")?;
            engine.delete_tag(user, id)?;
            println!("Deleted tag #{}", id);
        }
        Some(("restore", sub)) => {
            let tag = engine.restore_tag(user, required_id(sub, "id")?)?;
            println!("Restored tag #{} '{}'", tag.id, tag.name);
        }
        _ => {}
    }
    Ok(())
}
