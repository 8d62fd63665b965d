// Copyright 2026 Jobscout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(
    name = "jobscout",
    about = "Scrape job listings and rate them against a target salary",
    version,
    after_help = "Run 'jobscout <command> --help' for details on each command."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true, visible_alias = "debug", visible_short_alias = 'd')]
    verbose: bool,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the configured sources and export rated listings as CSV
    Scrape(cli::scrape::ScrapeArgs),
    /// Normalize and rate one piece of salary text offline
    Rate(cli::rate::RateArgs),
    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape(args) => {
            match jobscout::telemetry::init(cli.verbose, cli.log_file.as_deref()) {
                Ok(()) => cli::scrape::run(args, cli.json).await,
                Err(e) => Err(e),
            }
        }
        Commands::Rate(args) => cli::rate::run(args, cli.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "jobscout", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    result
}
