// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use crate::engine::Engine;
use crate::models::UserId;
use crate::utils::pretty_table;

pub fn handle(engine: &mut Engine, user: UserId, m: &clap::ArgMatches) -> Result<()> {
    let issues = engine.verify_balances(user)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
        return Ok(());
    }

    let rows = issues
        .iter()
        .map(|d| {
            vec![
                "balance_drift".into(),
                format!("#{} {}", d.account_id, d.name),
                d.stored.to_string(),
                d.computed.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Issue", "Account", "Stored", "Computed"], rows)
    );

    if m.get_flag("fix") {
        let fixed = engine.recompute_balances(user)?;
        println!("doctor: recomputed {} balance(s)", fixed);
    }
    Ok(())
}
