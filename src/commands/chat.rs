//! Interactive consultation handler
//!
//! Runs a readline loop over the chat session controller: plain text is
//! sent to the astrologer, slash commands manage the session. Advisor
//! replies with a structured payload are revealed segment by segment
//! through the reveal sequencer, with a composing indicator between
//! segments, the way the assistant "types".

use crate::chat::message::{AssistantKind, Message, Role};
use crate::chat::reveal::{RevealEvent, RevealSequencer};
use crate::chat::session::UserStatus;
use crate::chat::{ChatController, ChatTiming, ControllerEvent, SendOutcome};
use crate::config::Config;
use crate::error::{FindastroError, Result};
use crate::gateway::ApiClient;
use crate::session_store::SessionStore;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

/// Start the interactive consultation
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `store` - The logged-in identity
/// * `new_session` - Skip history resume and start fresh
pub async fn run_chat(config: Config, store: Arc<SessionStore>, new_session: bool) -> Result<()> {
    if !store.is_logged_in() {
        return Err(FindastroError::NotLoggedIn.into());
    }

    let api = Arc::new(ApiClient::new(&config.api, store.clone())?);
    let (controller, mut events) = ChatController::new(
        api,
        store.clone(),
        ChatTiming::from_config(&config.chat),
    );
    let controller = Arc::new(controller);
    controller.start(new_session).await;

    print_banner(store.user_name().as_deref());
    for message in controller.messages() {
        print_message(&message);
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        drain_events(&mut events, &controller);

        let prompt = format_prompt(&controller);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match trimmed {
                    "/quit" | "/exit" => break,
                    "/help" => {
                        print_help();
                        continue;
                    }
                    "/new" => {
                        controller.new_session();
                        println!("{}", "A fresh journey begins.".green());
                        for message in controller.messages() {
                            print_message(&message);
                        }
                        continue;
                    }
                    "/continue" => {
                        controller.dismiss_inactivity_prompt();
                        continue;
                    }
                    "/end" => {
                        end_consultation(&controller, &mut rl).await?;
                        continue;
                    }
                    other if other.starts_with('/') => {
                        println!("Unknown command {}. Try /help.", other);
                        continue;
                    }
                    _ => {}
                }

                match controller.send(trimmed).await? {
                    SendOutcome::Delivered => {
                        if let Some(reply) = controller.last_message() {
                            render_reply(&controller, &config, &reply).await;
                        }
                    }
                    SendOutcome::Failed => {
                        if let Some(reply) = controller.last_message() {
                            print_message(&reply);
                        }
                    }
                    SendOutcome::Dropped => explain_drop(&controller),
                }

                drain_events(&mut events, &controller);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// End the consultation: summary, then the feedback prompt
async fn end_consultation(controller: &ChatController, rl: &mut DefaultEditor) -> Result<()> {
    let summary = match controller.end(false).await {
        Ok(summary) => summary,
        Err(e) => {
            println!(
                "{}",
                format!("Failed to summarize chat: {}. You can keep chatting.", e).red()
            );
            return Ok(());
        }
    };

    println!();
    println!("{}", "Session Insights".truecolor(243, 106, 47).bold());
    println!("  \"{}\"", summary.text.italic());
    println!();

    loop {
        let line = rl.readline("Rate Guruji's wisdom (1-5), or 'review' to keep chatting: ")?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("review") {
            controller.dismiss_summary();
            println!("The session stays open.");
            return Ok(());
        }
        let rating: u8 = match input.parse() {
            Ok(r) => r,
            Err(_) => {
                println!("{}", "Please enter a number from 1 to 5.".red());
                continue;
            }
        };
        let comment = rl.readline("Add a thought (optional): ")?;
        match controller.submit_feedback(rating, comment.trim()).await {
            Ok(()) => {
                println!(
                    "{}",
                    "Gratitude! Your feedback has been cast into the heavens.".green()
                );
                println!("Start a new journey with /new, or /quit to leave.");
                return Ok(());
            }
            Err(e) => println!("{}", e.to_string().red()),
        }
    }
}

/// Print a delivered reply, animating structured payloads
async fn render_reply(controller: &ChatController, config: &Config, reply: &Message) {
    let animate = config.reveal.animate && reply.is_animating;
    match &reply.structured_payload {
        Some(payload) => {
            let mut sequencer = RevealSequencer::new(payload, animate, &config.reveal);
            let segments = sequencer.segments().to_vec();
            let label = persona_label(reply);
            let cancel = CancellationToken::new();
            sequencer
                .drive(&cancel, |event| match event {
                    RevealEvent::ComposingStarted => {
                        println!("{}", format!("{} is composing...", label).dimmed());
                    }
                    RevealEvent::Revealed(i) => {
                        print_bubble(&label, &segments[i]);
                    }
                    RevealEvent::Completed => {}
                })
                .await;
            controller.clear_animation();
            if let Some(amount) = reply.charge_amount {
                if amount > 0.0 {
                    println!("{}", format!("  PREMIUM: -{} coins", amount).yellow());
                }
            }
        }
        None => {
            print_message(reply);
            controller.clear_animation();
        }
    }
}

fn explain_drop(controller: &ChatController) {
    if controller.is_sending() {
        println!("{}", "Guruji is still replying; one question at a time.".dimmed());
        return;
    }
    match controller.status() {
        UserStatus::Checking | UserStatus::Processing => println!(
            "{}",
            "Your chart is still being prepared; one moment please.".dimmed()
        ),
        UserStatus::Failed => println!(
            "{}",
            "Your profile could not be prepared. Try again later.".red()
        ),
        UserStatus::Ready => {}
    }
}

fn drain_events(events: &mut UnboundedReceiver<ControllerEvent>, controller: &ChatController) {
    while let Ok(event) = events.try_recv() {
        match event {
            ControllerEvent::StatusChanged(status) => match status {
                UserStatus::Ready => {
                    println!("{}", "Guruji is ready for you.".green());
                }
                UserStatus::Failed => {
                    println!(
                        "{}",
                        "Your profile could not be prepared. Sending is disabled.".red()
                    );
                }
                UserStatus::Processing => {
                    println!("{}", "Preparing your chart...".dimmed());
                }
                UserStatus::Checking => {}
            },
            ControllerEvent::WalletUpdated(balance) => {
                tracing::debug!("Wallet balance now {}", balance);
            }
            ControllerEvent::InactivityPrompt => {
                if controller.inactivity_prompt_active() {
                    println!();
                    println!("{}", "Still here?".bold());
                    println!(
                        "Guruji is ready when you are. Use /end to wrap up and get your summary, or /continue to keep going."
                    );
                }
            }
        }
    }
}

fn format_prompt(controller: &ChatController) -> String {
    let status = controller.status();
    let balance = controller
        .wallet_balance()
        .map(|b| format!("{:.0}", b))
        .unwrap_or_else(|| "-".to_string());
    format!("[{}][{} coins] >> ", status, balance)
}

fn print_banner(user_name: Option<&str>) {
    match user_name {
        Some(name) => println!(
            "Welcome back to {}, {}!",
            "Findastro".truecolor(220, 93, 53).bold(),
            name
        ),
        None => println!("Welcome to {}!", "Findastro".truecolor(220, 93, 53).bold()),
    }
    println!("Type /help for commands.\n");
}

fn print_help() {
    println!("Commands:");
    println!("  /end       End the consultation and get your summary");
    println!("  /new       Start a fresh session");
    println!("  /continue  Dismiss the inactivity prompt");
    println!("  /help      This help");
    println!("  /quit      Leave (the session stays resumable)");
}

fn print_message(message: &Message) {
    match message.role {
        Role::User => println!("{} {}", "You:".bold(), render_markup(&message.content)),
        Role::Assistant => {
            if let Some(payload) = &message.structured_payload {
                let label = persona_label(message);
                for segment in payload.segments() {
                    print_bubble(&label, &segment);
                }
            } else {
                print_bubble(&persona_label(message), &message.content);
            }
            if let Some(amount) = message.charge_amount {
                if amount > 0.0 {
                    println!("{}", format!("  PREMIUM: -{} coins", amount).yellow());
                }
            }
        }
    }
}

fn print_bubble(label: &str, text: &str) {
    println!(
        "{} {}",
        format!("{}:", label).truecolor(255, 131, 56).bold(),
        render_markup(text)
    );
}

fn persona_label(message: &Message) -> String {
    message
        .assistant_kind
        .unwrap_or(AssistantKind::Advisor)
        .label()
        .to_string()
}

/// Flatten the backend's simple markup for terminal output
fn render_markup(text: &str) -> String {
    text.replace("<br><br>", "\n").replace("<br>", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markup_flattens_breaks() {
        assert_eq!(render_markup("a<br>b"), "a\nb");
        assert_eq!(render_markup("a<br><br>b"), "a\nb");
        assert_eq!(render_markup("plain"), "plain");
    }

    #[test]
    fn test_persona_label_defaults_to_advisor() {
        let message = Message::user("hi");
        assert_eq!(persona_label(&message), "Astrology Guruji");

        let message = Message::greeting();
        assert_eq!(persona_label(&message), "Maya");
    }
}
