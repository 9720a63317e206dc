//! Message types for the chat session
//!
//! This module defines the message log's data model: roles, assistant
//! personas, the advisor's structured reply payload, and the message
//! record itself. Wire names match the backend (`assistant`,
//! `guruji_json`, `amount`) so the log serializes directly into the
//! history field of chat requests.

use serde::{Deserialize, Serialize};

/// Synthetic greeting shown at the start of every session
pub const GREETING: &str =
    "welcome! I'll connect you to our astrologer.\nYou may call him as 'Guruji'";

/// Generic reply appended when a send fails
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Reply appended when the stored identity is missing mid-session
pub const SESSION_ERROR_REPLY: &str = "Session error. Please log in again.";

/// Follow-up prompt used when the advisor reply omits one
pub const DEFAULT_FOLLOW_UP: &str = "🤔 What's Next?";

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Message produced by the backend
    Assistant,
}

/// Which assistant persona produced a reply
///
/// The receptionist ("maya") triages; the advisor ("guruji") answers in
/// depth. Only meaningful on assistant messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssistantKind {
    /// The triaging receptionist persona
    #[serde(rename = "maya")]
    Receptionist,
    /// The in-depth advisor persona
    #[serde(rename = "guruji")]
    #[serde(other)]
    Advisor,
}

impl AssistantKind {
    /// Map the backend's `assistant` field onto a persona
    ///
    /// Absent or unrecognized values default to the advisor, matching the
    /// backend's own labeling of chat replies.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("maya") => Self::Receptionist,
            _ => Self::Advisor,
        }
    }

    /// Display label for the persona
    pub fn label(&self) -> &'static str {
        match self {
            Self::Receptionist => "Maya",
            Self::Advisor => "Astrology Guruji",
        }
    }
}

/// The advisor's structured reply payload
///
/// Up to three narrative paragraphs plus a follow-up prompt. The third
/// paragraph and the follow-up are rendered as one trailing segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub para1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub para2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub para3: Option<String>,
    /// Follow-up prompt appended to the last paragraph
    #[serde(default, alias = "followup", skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

impl AdvisorReply {
    /// The displayable segments of this reply, in order
    ///
    /// The third segment is `para3` concatenated with the follow-up
    /// prompt (or [`DEFAULT_FOLLOW_UP`] when the backend omits one).
    /// Blank segments are filtered out; they are never shown and never
    /// count toward reveal timing.
    pub fn segments(&self) -> Vec<String> {
        let follow_up = self
            .follow_up
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_FOLLOW_UP);
        let third = format!(
            "{}<br><br>{}",
            self.para3.as_deref().unwrap_or(""),
            follow_up
        );

        [
            self.para1.clone().unwrap_or_default(),
            self.para2.clone().unwrap_or_default(),
            third,
        ]
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect()
    }
}

/// One turn in the conversation
///
/// The log is append-only within a session; the only permitted mutation
/// of an existing message is clearing the transient `is_animating` flag
/// once its reveal completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Display text (may embed simple markup such as `<br>`)
    #[serde(default)]
    pub content: String,
    /// Persona that produced an assistant message
    #[serde(rename = "assistant", default, skip_serializing_if = "Option::is_none")]
    pub assistant_kind: Option<AssistantKind>,
    /// The advisor's structured reply, when present
    #[serde(
        rename = "guruji_json",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_payload: Option<AdvisorReply>,
    /// Coins debited for this turn, when the backend charged one
    #[serde(rename = "amount", default, skip_serializing_if = "Option::is_none")]
    pub charge_amount: Option<f64>,
    /// Transient: true only for the newest assistant message, until its
    /// reveal completes. Never serialized.
    #[serde(skip)]
    pub is_animating: bool,
}

impl Message {
    /// Creates a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use findastro::chat::message::{Message, Role};
    ///
    /// let msg = Message::user("Will I travel this year?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            assistant_kind: None,
            structured_payload: None,
            charge_amount: None,
            is_animating: false,
        }
    }

    /// Creates a plain assistant message
    pub fn assistant(content: impl Into<String>, kind: AssistantKind) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            assistant_kind: Some(kind),
            structured_payload: None,
            charge_amount: None,
            is_animating: false,
        }
    }

    /// Creates the synthetic receptionist greeting
    pub fn greeting() -> Self {
        Self::assistant(GREETING, AssistantKind::Receptionist)
    }

    /// Creates the generic error reply appended when a send fails
    pub fn error_reply() -> Self {
        Self::assistant(ERROR_REPLY, AssistantKind::Advisor)
    }

    /// Creates an advisor reply from a chat response
    ///
    /// The message carries the structured payload, charge amount, and
    /// the `is_animating` flag so the reveal sequencer picks it up.
    pub fn from_response(response: crate::gateway::types::ChatResponse) -> Self {
        Self {
            role: Role::Assistant,
            assistant_kind: Some(AssistantKind::from_wire(response.assistant.as_deref())),
            content: response.answer,
            structured_payload: response.guruji_json,
            charge_amount: response.amount,
            is_animating: true,
        }
    }

    /// True for assistant messages
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
