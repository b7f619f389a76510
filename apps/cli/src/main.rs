//! assetlane publisher entry point.

mod accounts;
mod app;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assetlane", version, about = "Publish packages as catalog items")]
struct Cli {
    /// Configuration file (defaults to ~/.config/assetlane/publisher.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate, discover, transfer and finalize in one go
    Publish {
        /// Linked account id
        #[arg(long)]
        account: String,
        /// Category key (hair, top, bottom, dress, shoes)
        #[arg(long)]
        category: String,
        /// Package to upload
        file: PathBuf,
    },
    /// Authenticate and discover; print the upload ticket as JSON
    Prepare {
        #[arg(long)]
        account: String,
        #[arg(long)]
        category: String,
        file: PathBuf,
    },
    /// Link, build and publish a file transferred with a ticket
    Finalize {
        /// Ticket JSON file, or `-` for stdin
        ticket: PathBuf,
    },
    /// Verify an account's stored credentials
    CheckAccount {
        #[arg(long)]
        account: String,
    },
    /// List the configured upload candidates in scan order
    Candidates,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(&app::config_path(cli.config))?;

    match cli.command {
        Commands::Publish {
            account,
            category,
            file,
        } => app::publish(&config, &account, &category, &file).await,
        Commands::Prepare {
            account,
            category,
            file,
        } => app::prepare(&config, &account, &category, &file).await,
        Commands::Finalize { ticket } => app::finalize(&config, &ticket).await,
        Commands::CheckAccount { account } => app::check_account(&config, &account).await,
        Commands::Candidates => app::candidates(&config),
    }
}
