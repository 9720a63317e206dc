//! Session, summary, feedback, and readiness types
//!
//! A session is one continuous conversation: an append-only message log
//! under a session id. Sessions are created locally, adopted wholesale
//! from server history on resume, and terminated (not deleted) when the
//! user ends the consultation.

use crate::chat::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A local log at or below this length is still "untouched" (greeting
/// only, possibly one stray turn) and eligible for wholesale adoption of
/// the server's most recent session on resume.
pub const RESUME_THRESHOLD: usize = 2;

/// One conversation with the assistant
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier; minted locally at session start or
    /// adopted from the server on resume
    pub session_id: String,
    /// Ordered message log; insertion order is chronological order.
    /// Index 0 is always the synthetic greeting.
    pub messages: Vec<Message>,
    /// When this session object was created locally
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session: a newly minted id and the greeting
    pub fn new() -> Self {
        Self {
            session_id: mint_session_id(),
            messages: vec![Message::greeting()],
            started_at: Utc::now(),
        }
    }

    /// True while the local log is still at its untouched initial state
    ///
    /// Used by the resume heuristic: only an untouched log may be
    /// replaced by server history.
    pub fn is_at_initial_state(&self) -> bool {
        self.messages.len() <= RESUME_THRESHOLD
    }

    /// Adopt a server-held session wholesale
    ///
    /// Replaces the session id and the entire message log. No merge, no
    /// duplication; the local greeting is discarded in favor of the
    /// server's record.
    pub fn adopt(&mut self, session_id: impl Into<String>, messages: Vec<Message>) {
        self.session_id = session_id.into();
        self.messages = messages;
    }

    /// The log as sent to the backend with a new message: everything
    /// after the synthetic greeting
    pub fn history_for_send(&self) -> Vec<Message> {
        self.messages.iter().skip(1).cloned().collect()
    }

    /// Clear the reveal flag on every message
    ///
    /// The only permitted mutation of an existing log entry.
    pub fn clear_animation(&mut self) {
        for message in &mut self.messages {
            message.is_animating = false;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint a timestamp-derived session id, e.g. `SESS_1754550000000`
fn mint_session_id() -> String {
    format!("SESS_{}", Utc::now().timestamp_millis())
}

/// Server-computed synopsis of a session
///
/// Exists only transiently between "end chat" and either dismissal
/// (which keeps the session open) or feedback submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// The synopsis text
    pub text: String,
}

/// The user's rating of a completed session
#[derive(Debug, Clone, Default)]
pub struct Feedback {
    /// Star rating, 1-5; required before submission
    pub rating: u8,
    /// Optional free-text comment
    pub comment: String,
    /// Set once a submission succeeds; gates resubmission
    pub submitted: bool,
}

/// Whether the user's profile is ready for consultation
///
/// Polled from the backend; gates sending. Never persisted, recomputed
/// for every mounted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    /// Initial state: the first status response has not arrived yet
    Checking,
    /// The backend is still preparing the user's profile
    Processing,
    /// Consultation may begin
    Ready,
    /// Profile preparation failed
    Failed,
}

impl UserStatus {
    /// Parse the backend's status string
    ///
    /// Unknown strings map to `Failed`, keeping the state machine total.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "checking" => Self::Checking,
            "processing" => Self::Processing,
            "ready" => Self::Ready,
            _ => Self::Failed,
        }
    }

    /// True once the status is settled (polling may stop)
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "checking"),
            Self::Processing => write!(f, "processing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
