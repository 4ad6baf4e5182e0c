//! Tamarind CLI - Database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! tamarind migrate
//!
//! # Create the first owner account
//! tamarind user create -u somsak -n "Somsak P." -r owner
//!
//! # Load a demo catalog and default settings
//! tamarind seed
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create accounts
//! - `seed` - Seed the database with a demo catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tamarind")]
#[command(author, version, about = "Tamarind POS CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database with a demo catalog and default settings
    Seed,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login username
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`owner`, `staff`, `dealer`, `dealer_vip`)
        #[arg(short, long, default_value = "staff")]
        role: String,

        /// Password; prompted interactively when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                name,
                role,
                password,
            } => {
                commands::user::create(&username, &name, &role, password.as_deref()).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}
