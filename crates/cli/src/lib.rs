pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "foreman",
    about = "Foreman operator CLI",
    long_about = "Try queries against the intent resolver and inspect Foreman configuration.",
    after_help = "Examples:\n  foreman resolve \"what jobs are due today\" --json\n  foreman config\n  foreman doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve a query to a category, a document, or no match")]
    Resolve {
        #[arg(help = "Query text, as a user would type it in Slack")]
        query: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Use built-in tables and skip the Sheets and LLM calls")]
        offline: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, resolver tables, SOP sheet access, and the LLM client")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Resolve { query, json, offline } => {
            commands::resolve::run(&query, commands::resolve::ResolveOptions { json, offline })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
