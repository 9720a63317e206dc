//! Findastro - terminal astrology consultation client
//!
//! Main entry point: parses the CLI, loads configuration, opens the
//! session store, and dispatches to the command handlers.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use findastro::cli::{Cli, Commands};
use findastro::commands;
use findastro::config::Config;
use findastro::session_store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config, cli.api_base.as_deref())?;
    config.validate()?;

    let store = Arc::new(SessionStore::open()?);

    match cli.command {
        Commands::Login => commands::login::run_login(&config, store).await,
        Commands::Chat { new_session } => {
            tracing::info!("Starting consultation (new_session={})", new_session);
            commands::chat::run_chat(config, store, new_session).await
        }
        Commands::History => commands::history::run_history(&config, store).await,
        Commands::Wallet { command } => {
            commands::wallet::run_wallet(&config, store, command).await
        }
        Commands::Admin { command } => commands::admin::run_admin(&config, store, command).await,
        Commands::Logout => {
            store.clear()?;
            println!("Logged out. Your consultations remain on the server.");
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "findastro=debug"
    } else {
        "findastro=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
