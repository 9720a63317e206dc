//! Wallet command handlers

use crate::cli::WalletCommand;
use crate::config::Config;
use crate::error::{FindastroError, Result};
use crate::gateway::types::RechargeRequest;
use crate::gateway::ApiClient;
use crate::session_store::SessionStore;
use colored::Colorize;
use prettytable::{row, Table};
use std::sync::Arc;

/// Dispatch a wallet subcommand
pub async fn run_wallet(
    config: &Config,
    store: Arc<SessionStore>,
    command: WalletCommand,
) -> Result<()> {
    let api = ApiClient::new(&config.api, store.clone())?;

    match command {
        WalletCommand::Status => {
            let status = api.wallet_status().await.map_err(FindastroError::Api)?;
            if status.enabled {
                println!("The wallet system is {}.", "enabled".green());
            } else {
                println!("The wallet system is {}.", "disabled".yellow());
            }
        }
        WalletCommand::Balance => {
            let mobile = store.mobile().ok_or(FindastroError::NotLoggedIn)?;
            let balance = api
                .wallet_balance(&mobile)
                .await
                .map_err(FindastroError::Api)?;
            println!("Balance: {} coins", format!("{:.0}", balance.balance).bold());
        }
        WalletCommand::History => {
            let mobile = store.mobile().ok_or(FindastroError::NotLoggedIn)?;
            let history = api
                .wallet_history(&mobile)
                .await
                .map_err(FindastroError::Api)?;
            if history.transactions.is_empty() {
                println!("No wallet activity yet.");
                return Ok(());
            }
            let mut table = Table::new();
            table.add_row(row!["When", "Type", "Coins", "Description"]);
            for tx in &history.transactions {
                table.add_row(row![
                    tx.created_at.as_deref().unwrap_or("-"),
                    tx.kind,
                    format!("{:.0}", tx.amount),
                    tx.description.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
        WalletCommand::Recharge { amount } => {
            if amount <= 0.0 {
                return Err(FindastroError::Validation(
                    "The recharge amount must be positive.".into(),
                )
                .into());
            }
            let mobile = store.mobile().ok_or(FindastroError::NotLoggedIn)?;
            let request = RechargeRequest { mobile, amount };
            let response = api
                .recharge_wallet(&request)
                .await
                .map_err(FindastroError::Api)?;
            println!(
                "{} New balance: {} coins",
                "Recharge successful.".green(),
                format!("{:.0}", response.balance).bold()
            );
        }
    }
    Ok(())
}
