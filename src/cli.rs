//! Command-line interface definition for the Findastro client
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for login, chat, history, wallet, and admin
//! operations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Findastro - terminal client for the astrology consultation service
///
/// Log in with your phone number, consult the astrologer in an
/// interactive chat, and review your sessions and wallet.
#[derive(Parser, Debug, Clone)]
#[command(name = "findastro")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the backend base URL
    #[arg(long, env = "FINDASTRO_API_BASE")]
    pub api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the Findastro client
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with your phone number (OTP over SMS)
    Login,

    /// Start or resume a consultation with the astrologer
    Chat {
        /// Start a fresh session instead of resuming the last one
        #[arg(long)]
        new_session: bool,
    },

    /// List your past consultation sessions
    History,

    /// Wallet balance, ledger, and recharge
    Wallet {
        /// Wallet subcommand
        #[command(subcommand)]
        command: WalletCommand,
    },

    /// Administrative operations (requires admin login)
    Admin {
        /// Admin subcommand
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Log out and forget the stored identity
    Logout,
}

/// Wallet subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum WalletCommand {
    /// Whether the wallet system is enabled
    Status,

    /// Current coin balance
    Balance,

    /// Transaction ledger
    History,

    /// Add coins to the wallet
    Recharge {
        /// Amount of coins to add
        #[arg(short, long)]
        amount: f64,
    },
}

/// Admin subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Authenticate as an administrator
    Login {
        /// Admin username (password is prompted)
        #[arg(short, long)]
        username: String,
    },

    /// List registered users
    Users,

    /// Show one user's details
    User {
        /// The user's mobile number
        mobile: String,
    },

    /// Show or update the astrologer system prompt
    SystemPrompt {
        /// Replace the prompt with this text
        #[arg(long)]
        set: Option<String>,
    },

    /// Show or update the receptionist prompt
    MayaPrompt {
        /// Replace the prompt with this text
        #[arg(long)]
        set: Option<String>,
    },

    /// Dashboard statistics
    Stats {
        /// Time range, e.g. 24H, 7D, 30D
        #[arg(long, default_value = "7D")]
        range: String,
    },

    /// Enable or disable the wallet system for everyone
    WalletToggle {
        /// true to enable, false to disable
        #[arg(long)]
        enabled: bool,
    },

    /// Upload a document for the chat tester
    TestUpload {
        /// Path to the file to upload
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Process an uploaded document into a testable doc id
    TestProcess {
        /// Server-side filename returned by test-upload
        #[arg(long)]
        filename: String,
    },

    /// Send a message through the chat tester
    TestChat {
        /// The message to test
        #[arg(short, long)]
        message: String,

        /// Document id returned by test-process
        #[arg(long)]
        doc_id: String,

        /// Model to test against
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
