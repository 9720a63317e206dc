//! Past sessions listing

use crate::chat::message::Role;
use crate::config::Config;
use crate::error::{FindastroError, Result};
use crate::gateway::{ApiClient, Backend};
use crate::session_store::SessionStore;
use prettytable::{row, Table};
use std::sync::Arc;

/// List the server-held sessions for the logged-in user
pub async fn run_history(config: &Config, store: Arc<SessionStore>) -> Result<()> {
    let mobile = store.mobile().ok_or(FindastroError::NotLoggedIn)?;
    let api = ApiClient::new(&config.api, store.clone())?;

    let response = api
        .chat_history(&mobile)
        .await
        .map_err(FindastroError::Api)?;

    if response.sessions.is_empty() {
        println!("No consultations yet. Run `findastro chat` to begin.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["Session", "Messages", "First question"]);
    for session in &response.sessions {
        let first_question = session
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| truncate(&m.content, 48))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            session.session_id,
            session.messages.len(),
            first_question
        ]);
    }
    table.printstd();
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(max_len - 3).collect();
        truncated.push_str("...");
        truncated
    }
}
