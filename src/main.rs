//! Monad Activity Scheduler CLI
//!
//! Command-line interface for importing wallets and running the schedulers.

use clap::{Parser, Subcommand};
use monad_activity::logging::setup_logging;
use monad_activity::{AppRunner, FilePaths, Result, RpcConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "monad-activity")]
#[command(about = "Randomized DeFi activity for a fleet of Monad testnet wallets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding settings.json, import.csv and the state files
    #[arg(long, global = true, default_value = "files")]
    files_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import wallets from import.csv into wallets.json
    Import,

    /// Run the initial-sequence and activity swap loops
    Run,

    /// Run the one-time mandatory checklist for every wallet
    Mandatory,

    /// Log the MON balance of every wallet
    Balances,

    /// Show the effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json_logs);

    let runner = AppRunner::new(FilePaths::new(cli.files_dir), RpcConfig::from_env());

    match cli.command {
        Commands::Import => {
            runner.import().await?;
        }
        Commands::Run => {
            runner.run_swaps().await?;
        }
        Commands::Mandatory => {
            runner.run_mandatory().await?;
        }
        Commands::Balances => {
            runner.balances().await?;
        }
        Commands::Config => {
            let settings = runner.settings().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
