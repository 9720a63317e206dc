//! Admin command handlers
//!
//! Dashboard queries, prompt management, and the chat tester. Admin
//! login stores its bearer token in the session store the same way user
//! login does; the token rides on every subsequent admin call.

use crate::cli::AdminCommand;
use crate::config::Config;
use crate::error::{FindastroError, Result};
use crate::gateway::types::DashboardStats;
use crate::gateway::ApiClient;
use crate::session_store::SessionStore;
use colored::Colorize;
use prettytable::{row, Table};
use rustyline::DefaultEditor;
use std::sync::Arc;

/// Dispatch an admin subcommand
pub async fn run_admin(
    config: &Config,
    store: Arc<SessionStore>,
    command: AdminCommand,
) -> Result<()> {
    let api = ApiClient::new(&config.api, store.clone())?;

    match command {
        AdminCommand::Login { username } => {
            let mut rl = DefaultEditor::new()?;
            let password = rl.readline("Password: ")?;
            let response = api
                .admin_login(&username, password.trim())
                .await
                .map_err(FindastroError::Api)?;
            store.set_token(&response.access_token)?;
            println!("{}", "Admin login successful.".green());
        }
        AdminCommand::Users => {
            let response = api.admin_users().await.map_err(FindastroError::Api)?;
            if response.users.is_empty() {
                println!("No registered users.");
                return Ok(());
            }
            let mut table = Table::new();
            table.add_row(row!["Mobile", "Name", "Balance", "Last active"]);
            for user in &response.users {
                table.add_row(row![
                    user.mobile,
                    user.name.as_deref().unwrap_or("-"),
                    user.wallet_balance
                        .map(|b| format!("{:.0}", b))
                        .unwrap_or_else(|| "-".to_string()),
                    user.last_active.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
        AdminCommand::User { mobile } => {
            let details = api
                .admin_user_details(&mobile)
                .await
                .map_err(FindastroError::Api)?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        AdminCommand::SystemPrompt { set } => match set {
            Some(prompt) => {
                api.update_system_prompt(&prompt)
                    .await
                    .map_err(FindastroError::Api)?;
                println!("{}", "System prompt updated.".green());
            }
            None => {
                let response = api.system_prompt().await.map_err(FindastroError::Api)?;
                println!("{}", response.prompt);
            }
        },
        AdminCommand::MayaPrompt { set } => match set {
            Some(prompt) => {
                api.update_maya_prompt(&prompt)
                    .await
                    .map_err(FindastroError::Api)?;
                println!("{}", "Receptionist prompt updated.".green());
            }
            None => {
                let response = api.maya_prompt().await.map_err(FindastroError::Api)?;
                println!("{}", response.prompt);
            }
        },
        AdminCommand::Stats { range } => {
            let stats = api
                .dashboard_stats(&range)
                .await
                .map_err(FindastroError::Api)?;
            print_stats(&range, &stats);
        }
        AdminCommand::WalletToggle { enabled } => {
            api.toggle_wallet_system(enabled)
                .await
                .map_err(FindastroError::Api)?;
            if enabled {
                println!("{}", "Wallet system enabled.".green());
            } else {
                println!("{}", "Wallet system disabled.".yellow());
            }
        }
        AdminCommand::TestUpload { file } => {
            let response = api
                .admin_test_upload(&file)
                .await
                .map_err(FindastroError::Api)?;
            println!("Uploaded as {}", response.filename.bold());
        }
        AdminCommand::TestProcess { filename } => {
            let response = api
                .admin_test_process(&filename)
                .await
                .map_err(FindastroError::Api)?;
            println!("Processed. doc_id: {}", response.doc_id.bold());
        }
        AdminCommand::TestChat {
            message,
            doc_id,
            model,
        } => {
            let response = api
                .admin_test_chat(&message, &doc_id, &model)
                .await
                .map_err(FindastroError::Api)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

fn print_stats(range: &str, stats: &DashboardStats) {
    println!("Dashboard ({})", range);
    let mut table = Table::new();
    table.add_row(row!["Metric", "Value", "Trend"]);
    table.add_row(row![
        "Total users",
        stats.total_users,
        format_trend(stats.trends.users)
    ]);
    table.add_row(row!["Active today", stats.active_today, ""]);
    table.add_row(row![
        "Conversations",
        stats.total_conversations,
        format_trend(stats.trends.conversations)
    ]);
    table.add_row(row![
        "Avg RAG score",
        format!("{:.2}", stats.average_rag_score),
        ""
    ]);
    table.add_row(row![
        "Wallet volume",
        format!("{:.0}", stats.wallet_volume),
        format_trend(stats.trends.wallet)
    ]);
    table.add_row(row![
        "Total dakshina",
        format!("{:.0}", stats.total_dakshina),
        ""
    ]);
    table.add_row(row!["Total tokens", stats.total_tokens, ""]);
    table.add_row(row!["AI cost", format!("{:.2}", stats.ai_cost), ""]);
    table.add_row(row![
        "Subscriptions",
        stats.active_subscriptions,
        format_trend(stats.trends.sessions)
    ]);
    table.printstd();
}

fn format_trend(trend: f64) -> String {
    if trend > 0.0 {
        format!("+{:.0}% growth", trend)
    } else if trend < 0.0 {
        format!("{:.0}% drop", trend)
    } else {
        String::new()
    }
}
