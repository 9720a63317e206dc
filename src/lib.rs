//! Findastro - terminal astrology consultation client library
//!
//! This library provides the core functionality for the Findastro
//! terminal client: the persisted identity store, the backend gateway,
//! the chat session controller, and the reveal sequencer.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session_store`: persisted identity (mobile, token, display name)
//! - `gateway`: typed HTTP client for the Findastro backend
//! - `chat`: message log, session controller, reveal sequencer
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line surface
//!
//! # Example
//!
//! ```no_run
//! use findastro::{ApiClient, ChatController, ChatTiming, Config, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", None)?;
//!     config.validate()?;
//!
//!     let store = Arc::new(SessionStore::open()?);
//!     let api = Arc::new(ApiClient::new(&config.api, store.clone())?);
//!     let (controller, _events) =
//!         ChatController::new(api, store, ChatTiming::from_config(&config.chat));
//!     controller.start(false).await;
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session_store;

// Re-export commonly used types
pub use chat::{ChatController, ChatTiming, ControllerEvent, RevealSequencer, SendOutcome};
pub use config::Config;
pub use error::{ApiError, FindastroError, Result};
pub use gateway::{ApiClient, Backend};
pub use session_store::SessionStore;
