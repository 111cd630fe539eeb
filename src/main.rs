// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finledger::{Engine, EngineConfig, cli, commands, models::UserId};

fn main() -> Result<()> {
    // Logs go to stderr so `--json` output stays machine readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finledger=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli::build_cli().get_matches();

    let mut config = EngineConfig::from_env()?;
    if let Some(path) = matches.get_one::<String>("db") {
        config.db_path = PathBuf::from(path);
    }
    let user: UserId = matches.get_one::<i64>("user").copied().unwrap_or(1);

    let mut engine = Engine::open(&config)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    match matches.subcommand() {
        Some(("init", sub)) => {
            if let Some(ccy) = sub.get_one::<String>("currency") {
                engine.set_default_currency(ccy)?;
            }
            println!(
                "Database initialized at {} (default currency {})",
                config.db_path.display(),
                engine.default_currency()?
            );
        }
        Some(("account", sub)) => commands::accounts::handle(&mut engine, user, sub)?,
        Some(("category", sub)) => commands::categories::handle(&mut engine, user, sub)?,
        Some(("tag", sub)) => commands::tags::handle(&mut engine, user, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut engine, user, sub)?,
        Some(("receipt", sub)) => commands::receipts::handle(&mut engine, user, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&mut engine, user, sub)?,
        Some(("report", sub)) => commands::reports::handle(&engine, user, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&mut engine, user, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
