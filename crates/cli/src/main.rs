//! Cookbook CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cookbook-cli migrate
//!
//! # Seed the bundled recipes into an account
//! cookbook-cli seed --account 9c1e0f4a2b3d5e6f
//!
//! # Seed recipes from a file into a new account
//! cookbook-cli seed --file recipes.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed recipes into an account

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cookbook-cli")]
#[command(author, version, about = "Cookbook CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed recipes into an account
    Seed {
        /// Account to seed; a new account is created when omitted
        #[arg(short, long)]
        account: Option<String>,

        /// JSON fixture (`{"recipes": [...]}`); the bundled set when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { account, file } => {
            commands::seed::run(account.as_deref(), file.as_deref()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_arguments_are_optional() {
        let cli = Cli::try_parse_from(["cookbook-cli", "seed"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Seed {
                account: None,
                file: None
            })
        ));
    }
}
