//! Opal CLI - database migrations and admin bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run site database migrations
//! opal-cli migrate
//!
//! # Grant the first super admin
//! opal-cli admin grant -e owner@opal.studio -r super_admin
//!
//! # List admins
//! opal-cli admin list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin grant` - Make an email an admin (or pending admin)
//! - `admin revoke` - Remove admin access
//! - `admin list` - Show the roster

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "opal-cli")]
#[command(author, version, about = "Opal site CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin access to an email
    Grant {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin role (`super_admin`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Remove admin access from an email
    Revoke {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// List admins and pending admins
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Admin { action } => match action {
            AdminAction::Grant {
                email,
                role,
                first_name,
                last_name,
            } => {
                commands::admin::grant(&email, &role, first_name.as_deref(), last_name.as_deref())
                    .await?;
            }
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}
