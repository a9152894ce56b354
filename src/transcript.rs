//! Transcript model
//!
//! A transcript is the ordered, append-only list of messages exchanged in
//! the current session. Ordering is append order; timestamps are display-only.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display name used when the subject's profile has no usable name
pub const FALLBACK_NAME: &str = "the candidate";

/// Notice seeded when a session could not be started
pub const INIT_FAILED_NOTICE: &str =
    "Sorry, the conversation could not be started. Please reset or try again later.";

/// Notice appended when a message could not be delivered
pub const SEND_FAILED_NOTICE: &str = "Sorry, something went wrong. Please try again.";

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Informational, not part of the conversation
    System,
    /// The person typing: visitor or interviewer
    Primary,
    /// The digital twin answering: assistant or candidate
    Counterpart,
}

impl Role {
    /// Map a wire label from either chat surface onto a role
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "system" => Some(Role::System),
            "user" | "interviewer" => Some(Role::Primary),
            "assistant" | "candidate" => Some(Role::Counterpart),
            _ => None,
        }
    }
}

/// Which of the two chat framings is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSurface {
    /// Open chat with a visitor
    #[default]
    Visitor,
    /// Formal interviewer/candidate framing
    Interview,
}

impl ChatSurface {
    /// Label shown for a role on this surface
    pub fn label(self, role: Role) -> &'static str {
        match (self, role) {
            (_, Role::System) => "system",
            (ChatSurface::Visitor, Role::Primary) => "user",
            (ChatSurface::Visitor, Role::Counterpart) => "assistant",
            (ChatSurface::Interview, Role::Primary) => "interviewer",
            (ChatSurface::Interview, Role::Counterpart) => "candidate",
        }
    }

    /// Opening line spoken by the twin once a session is up
    pub fn greeting(self, name: Option<&str>) -> String {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME);
        match self {
            ChatSurface::Visitor => format!(
                "Hi! I'm {name}. Thanks for stopping by. \
                 Ask me anything you'd like to know about my background."
            ),
            ChatSurface::Interview => {
                format!("Welcome to your interview with {name}. Ask any question you like.")
            }
        }
    }
}

impl FromStr for ChatSurface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visitor" | "chat" => Ok(ChatSurface::Visitor),
            "interview" => Ok(ChatSurface::Interview),
            other => Err(format!("unknown chat surface: {other}")),
        }
    }
}

impl fmt::Display for ChatSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatSurface::Visitor => f.write_str("visitor"),
            ChatSurface::Interview => f.write_str("interview"),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn primary(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Primary, content, timestamp)
    }

    pub fn counterpart(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Counterpart, content, timestamp)
    }

    pub fn notice(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::System, content, timestamp)
    }
}

/// Append-only message log for the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop every entry. Only a session reset may call this.
    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset as well as the naive form the backend
/// emits (`2024-05-01T10:00:00.123456`), which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
