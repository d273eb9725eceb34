mod admin;
mod catalog;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "runmate-cli")]
#[command(about = "RunMate store administration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Insert catalog products from a YAML file
    Seed {
        /// Catalog file with a top-level `products` list
        #[arg(long, default_value = "config/catalog.yaml")]
        path: PathBuf,
        /// Existing user who will own the seeded products
        #[arg(long)]
        owner_email: String,
    },
    /// Grant or revoke a user's admin flag
    SetAdmin {
        #[arg(long)]
        email: String,
        /// Remove the flag instead of granting it
        #[arg(long)]
        revoke: bool,
    },
    /// Print a bearer token for a stored user
    Token {
        #[arg(long)]
        email: String,
        /// Token lifetime in hours
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("runmate-cli: run with --help to list commands");
        return Ok(());
    };

    let pool = runmate_db::connect_pool_from_env().await?;
    match command {
        Commands::Migrate => {
            let applied = runmate_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed { path, owner_email } => {
            catalog::run_seed(&pool, &path, &owner_email).await?;
        }
        Commands::SetAdmin { email, revoke } => {
            admin::run_set_admin(&pool, &email, !revoke).await?;
        }
        Commands::Token { email, ttl_hours } => {
            let config = runmate_core::load_app_config_from_env()?;
            let token = admin::run_issue_token(&pool, &config.jwt_secret, &email, ttl_hours).await?;
            println!("{token}");
        }
    }

    pool.close().await;
    Ok(())
}
