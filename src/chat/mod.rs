//! Chat session core
//!
//! The message log data model, the session controller that orchestrates
//! it against the backend, and the reveal sequencer that animates
//! advisor replies.

pub mod controller;
pub mod message;
pub mod reveal;
pub mod session;

pub use controller::{ChatController, ChatTiming, ControllerEvent, SendOutcome};
pub use message::{AdvisorReply, AssistantKind, Message, Role};
pub use reveal::{RevealEvent, RevealSequencer};
pub use session::{Feedback, Session, Summary, UserStatus};
