// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{optional, required, required_id};
use crate::engine::{Engine, NewReceipt};
use crate::models::UserId;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let tx_id = required_id(sub, "tx")?;
            let raw_path = required(sub, "path")?;
            let path = Path::new(raw_path);
            let meta = fs::metadata(path)
                .with_context(|| format!("Cannot read receipt file {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid receipt file name {}", path.display()))?;
            let mime_type = match optional(sub, "mime") {
                Some(mime) => mime.to_string(),
                None => guess_mime(path).to_string(),
            };
            let receipt = engine.attach_receipt(
                user,
                tx_id,
                NewReceipt {
                    file_path: raw_path.to_string(),
                    file_name: file_name.to_string(),
                    file_size: meta.len(),
                    mime_type,
                },
            )?;
            println!(
                "Attached receipt #{} '{}' to transaction #{}",
                receipt.id, receipt.file_name, tx_id
            );
        }
        Some(("list", sub)) => {
            let receipts = engine.list_receipts(user, required_id(sub, "tx")?, sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &receipts)? {
                let rows = receipts
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.file_name.clone(),
                            r.mime_type.clone(),
                            r.file_size.to_string(),
                            if r.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "File", "Type", "Bytes", "Active"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = required_id(sub, "id")?;
            engine.delete_receipt(user, id)?;
            println!("Deleted receipt #{}", id);
        }
        _ => {}
    }
    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
