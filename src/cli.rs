// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn id_arg(name: &'static str) -> Arg {
    Arg::new(name).required(true).value_parser(value_parser!(i64))
}

fn all_flag() -> Arg {
    Arg::new("all")
        .long("all")
        .action(ArgAction::SetTrue)
        .help("Include inactive (soft-deleted) entries")
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .default_value("bank")
                        .help("cash | bank | credit_card | investment | other"),
                )
                .arg(Arg::new("currency").long("currency").help("ISO code, defaults to the configured currency"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(json_flags(Command::new("list").arg(all_flag())))
        .subcommand(
            Command::new("update")
                .arg(id_arg("id"))
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("type").long("type"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(Command::new("deactivate").arg(id_arg("id")))
        .subcommand(Command::new("restore").arg(id_arg("id")))
        .subcommand(
            Command::new("rm")
                .about("Delete an account for good; its transactions become unassigned")
                .arg(id_arg("id")),
        )
        .subcommand(json_flags(Command::new("summary")))
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("type").long("type").required(true).help("income | expense"))
                .arg(Arg::new("icon").long("icon"))
                .arg(Arg::new("color").long("color").help("#RRGGBB")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .arg(Arg::new("type").long("type"))
                .arg(all_flag()),
        ))
        .subcommand(
            Command::new("update")
                .arg(id_arg("id"))
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("icon").long("icon"))
                .arg(Arg::new("color").long("color")),
        )
        .subcommand(Command::new("rm").arg(id_arg("id")))
        .subcommand(Command::new("restore").arg(id_arg("id")))
        .subcommand(Command::new("seed").about("Insert the default system categories"))
}

fn tag_cmd() -> Command {
    Command::new("tag")
        .about("Manage tags")
        .subcommand_required(true)
        .subcommand(Command::new("add").arg(Arg::new("name").required(true)))
        .subcommand(json_flags(Command::new("list").arg(all_flag())))
        .subcommand(
            Command::new("rename")
                .arg(id_arg("id"))
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("rm").arg(id_arg("id")))
        .subcommand(Command::new("restore").arg(id_arg("id")))
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and edit transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("type").long("type").required(true).help("income | expense"))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("account").long("account").value_parser(value_parser!(i64)))
                .arg(Arg::new("date").long("date").help("YYYY-MM-DD, defaults to today"))
                .arg(Arg::new("description").long("description").default_value(""))
                .arg(Arg::new("notes").long("notes")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .arg(Arg::new("type").long("type"))
                .arg(Arg::new("category").long("category").value_parser(value_parser!(i64)))
                .arg(Arg::new("account").long("account").value_parser(value_parser!(i64)))
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to"))
                .arg(Arg::new("min").long("min"))
                .arg(Arg::new("max").long("max"))
                .arg(Arg::new("search").long("search"))
                .arg(Arg::new("limit").long("limit").value_parser(value_parser!(usize)))
                .arg(all_flag()),
        ))
        .subcommand(json_flags(Command::new("show").arg(id_arg("id"))))
        .subcommand(
            Command::new("edit")
                .arg(id_arg("id"))
                .arg(Arg::new("type").long("type"))
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("category").long("category").value_parser(value_parser!(i64)))
                .arg(
                    Arg::new("account")
                        .long("account")
                        .value_parser(value_parser!(i64))
                        .conflicts_with("no-account"),
                )
                .arg(
                    Arg::new("no-account")
                        .long("no-account")
                        .action(ArgAction::SetTrue)
                        .help("Unassign the transaction from its account"),
                )
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("description").long("description"))
                .arg(Arg::new("notes").long("notes")),
        )
        .subcommand(Command::new("rm").arg(id_arg("id")))
        .subcommand(Command::new("restore").arg(id_arg("id")))
        .subcommand(Command::new("tag").arg(id_arg("id")).arg(id_arg("tag")))
        .subcommand(Command::new("untag").arg(id_arg("id")).arg(id_arg("tag")))
}

fn receipt_cmd() -> Command {
    Command::new("receipt")
        .about("Receipt metadata attached to transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(id_arg("tx"))
                .arg(Arg::new("path").required(true))
                .arg(Arg::new("mime").long("mime").help("Guessed from the extension when omitted")),
        )
        .subcommand(json_flags(Command::new("list").arg(id_arg("tx")).arg(all_flag())))
        .subcommand(Command::new("rm").arg(id_arg("id")))
}

fn budget_cmd() -> Command {
    Command::new("budget")
        .about("Spending limits per category")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(Arg::new("period").long("period").default_value("monthly"))
                .arg(Arg::new("start").long("start").required(true))
                .arg(Arg::new("end").long("end")),
        )
        .subcommand(json_flags(Command::new("list").arg(all_flag())))
        .subcommand(
            Command::new("update")
                .arg(id_arg("id"))
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("end").long("end").conflicts_with("open-ended"))
                .arg(
                    Arg::new("open-ended")
                        .long("open-ended")
                        .action(ArgAction::SetTrue)
                        .help("Remove the end date"),
                ),
        )
        .subcommand(json_flags(
            Command::new("status").arg(Arg::new("date").long("date").help("Defaults to today")),
        ))
        .subcommand(json_flags(
            Command::new("exceeded")
                .about("Budgets that reached their limit")
                .arg(Arg::new("date").long("date")),
        ))
        .subcommand(json_flags(
            Command::new("analysis")
                .about("Covering budgets ordered by usage, highest first")
                .arg(Arg::new("date").long("date")),
        ))
        .subcommand(json_flags(
            Command::new("summary")
                .about("Totals and status counts over covering budgets")
                .arg(Arg::new("date").long("date")),
        ))
        .subcommand(json_flags(
            Command::new("show")
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("date").long("date")),
        ))
        .subcommand(Command::new("rm").arg(id_arg("id")))
        .subcommand(Command::new("restore").arg(id_arg("id")))
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Aggregated views over active transactions")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("summary")
                .arg(Arg::new("from").long("from").required(true))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("by")
                        .long("by")
                        .default_value("category")
                        .help("category | type | month"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("stats")
                .arg(Arg::new("from").long("from").required(true))
                .arg(Arg::new("to").long("to").required(true)),
        ))
}

pub fn build_cli() -> Command {
    Command::new("finledger")
        .about("Personal ledger with consistent balances and budgets")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Database file (overrides FINLEDGER_DB)"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .env("FINLEDGER_USER")
                .default_value("1")
                .value_parser(value_parser!(i64))
                .help("User the command acts for"),
        )
        .subcommand(
            Command::new("init").about("Create the database").arg(
                Arg::new("currency")
                    .long("currency")
                    .help("Default currency for new accounts"),
            ),
        )
        .subcommand(account_cmd())
        .subcommand(category_cmd())
        .subcommand(tag_cmd())
        .subcommand(tx_cmd())
        .subcommand(receipt_cmd())
        .subcommand(budget_cmd())
        .subcommand(report_cmd())
        .subcommand(
            Command::new("doctor")
                .about("Check stored balances against transaction history")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Rewrite drifted balances"),
                ),
        )
}
