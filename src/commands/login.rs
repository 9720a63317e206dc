//! Login command handler
//!
//! Phone number in, OTP over SMS, verify, and — for first-time users —
//! the registration details the astrologer needs to cast a chart. Input
//! is validated before any network call; the backend never sees a
//! malformed mobile number or OTP.

use crate::config::Config;
use crate::error::{FindastroError, Result};
use crate::gateway::types::RegisterRequest;
use crate::gateway::ApiClient;
use crate::session_store::SessionStore;
use colored::Colorize;
use regex::Regex;
use rustyline::DefaultEditor;
use std::sync::Arc;

/// Where the client goes after a successful OTP verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVerifyRoute {
    /// Known user: straight into the chat
    Chat,
    /// New user: registration first
    Registration,
}

/// Route for a verification result
pub fn post_verify_route(is_new_user: bool) -> PostVerifyRoute {
    if is_new_user {
        PostVerifyRoute::Registration
    } else {
        PostVerifyRoute::Chat
    }
}

/// Validate a mobile number before any network call
pub fn validate_mobile(mobile: &str) -> Result<()> {
    let pattern = Regex::new(r"^\d{10}$")
        .map_err(|e| FindastroError::Validation(format!("internal pattern error: {}", e)))?;
    if pattern.is_match(mobile) {
        Ok(())
    } else {
        Err(
            FindastroError::Validation("Please enter a valid 10-digit mobile number.".into())
                .into(),
        )
    }
}

/// Validate an OTP before any network call
pub fn validate_otp(otp: &str) -> Result<()> {
    if otp.len() == 4 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(FindastroError::Validation("Please enter all 4 digits.".into()).into())
    }
}

/// Run the login flow
pub async fn run_login(config: &Config, store: Arc<SessionStore>) -> Result<()> {
    if store.is_logged_in() {
        println!(
            "Already logged in as {}. Run `findastro logout` to switch accounts.",
            store.mobile().unwrap_or_default()
        );
        return Ok(());
    }

    let api = ApiClient::new(&config.api, store.clone())?;
    let mut rl = DefaultEditor::new()?;

    println!("Welcome to {}!", "Findastro".truecolor(220, 93, 53).bold());

    let mobile = loop {
        let line = rl.readline("Mobile number (+91): ")?;
        let candidate = line.trim().to_string();
        match validate_mobile(&candidate) {
            Ok(()) => break candidate,
            Err(e) => println!("{}", e.to_string().red()),
        }
    };

    if let Err(e) = api.send_otp(&mobile).await {
        return Err(FindastroError::Validation(format!(
            "Failed to send OTP: {}",
            e.user_message()
        ))
        .into());
    }
    store.set_mobile(&mobile)?;
    println!("{}", "OTP sent to your phone.".green());

    let verified = loop {
        let line = rl.readline("Enter the 4-digit OTP (or 'resend'): ")?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("resend") {
            match api.send_otp(&mobile).await {
                Ok(()) => println!("{}", "OTP resent!".green()),
                Err(e) => println!("{}", format!("Resend failed: {}", e.user_message()).red()),
            }
            continue;
        }
        if let Err(e) = validate_otp(input) {
            println!("{}", e.to_string().red());
            continue;
        }
        match api.verify_otp(&mobile, input).await {
            Ok(response) => break response,
            Err(e) => println!("{}", e.user_message().red()),
        }
    };

    store.set_token(&verified.access_token)?;
    tracing::info!("Logged in as {}", mobile);

    if post_verify_route(verified.is_new_user) == PostVerifyRoute::Registration {
        register(&api, &store, &mut rl, &mobile).await?;
    }

    println!(
        "{}",
        "You're all set. Run `findastro chat` to consult Guruji.".green()
    );
    Ok(())
}

/// Collect registration details for a first-time user
async fn register(
    api: &ApiClient,
    store: &SessionStore,
    rl: &mut DefaultEditor,
    mobile: &str,
) -> Result<()> {
    println!("A few details so Guruji can cast your chart:");

    let name = prompt_required(rl, "Your name: ")?;
    let birth_date = prompt_required(rl, "Birth date (YYYY-MM-DD): ")?;
    let birth_time = prompt_optional(rl, "Birth time (HH:MM, optional): ")?;
    let birth_place = prompt_optional(rl, "Birth place (optional): ")?;

    let request = RegisterRequest {
        mobile: mobile.to_string(),
        name: name.clone(),
        birth_date,
        birth_time,
        birth_place,
    };
    api.register(&request)
        .await
        .map_err(FindastroError::Api)?;
    store.set_user_name(&name)?;
    println!("{}", "Registration complete.".green());
    Ok(())
}

fn prompt_required(rl: &mut DefaultEditor, prompt: &str) -> Result<String> {
    loop {
        let line = rl.readline(prompt)?;
        let value = line.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
        println!("{}", "This field is required.".red());
    }
}

fn prompt_optional(rl: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    let line = rl.readline(prompt)?;
    let value = line.trim();
    Ok(if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mobile_accepts_ten_digits() {
        assert!(validate_mobile("9876543210").is_ok());
    }

    #[test]
    fn test_validate_mobile_rejects_short_numbers() {
        assert!(validate_mobile("12345").is_err());
    }

    #[test]
    fn test_validate_mobile_rejects_letters() {
        assert!(validate_mobile("98765abcde").is_err());
    }

    #[test]
    fn test_validate_mobile_rejects_eleven_digits() {
        assert!(validate_mobile("98765432100").is_err());
    }

    #[test]
    fn test_validate_otp_accepts_four_digits() {
        assert!(validate_otp("1234").is_ok());
    }

    #[test]
    fn test_validate_otp_rejects_short_and_long() {
        assert!(validate_otp("123").is_err());
        assert!(validate_otp("12345").is_err());
    }

    #[test]
    fn test_validate_otp_rejects_non_digits() {
        assert!(validate_otp("12a4").is_err());
    }

    #[test]
    fn test_known_user_routes_to_chat() {
        assert_eq!(post_verify_route(false), PostVerifyRoute::Chat);
    }

    #[test]
    fn test_new_user_routes_to_registration() {
        assert_eq!(post_verify_route(true), PostVerifyRoute::Registration);
    }
}
