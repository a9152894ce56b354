//! Session types and wire formats

use super::ClientError;
use crate::profile::{Profile, ProfileSummary};
use crate::transcript::{parse_timestamp, Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque server-issued conversation token. Never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The counterpart's answer to one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Authoritative session id; may differ from the one sent
    pub session_id: Option<SessionId>,
}

// ============================================================================
// Wire Formats
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct StartSessionBody {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseBody {
    pub response: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ChatResponseBody {
    pub fn into_reply(self) -> Reply {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| {
                tracing::debug!(raw = ?self.timestamp, "Reply timestamp missing or unreadable, using local clock");
                Utc::now()
            });
        Reply {
            text: self.response,
            timestamp,
            session_id: self.session_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryBody {
    #[serde(default)]
    pub history: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

impl TryFrom<WireMessage> for Message {
    type Error = ClientError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let role = Role::from_label(&wire.role)
            .ok_or_else(|| ClientError::decode(format!("unknown message role: {}", wire.role)))?;
        let timestamp = parse_timestamp(&wire.timestamp).ok_or_else(|| {
            ClientError::decode(format!("unreadable message timestamp: {}", wire.timestamp))
        })?;
        Ok(Message::new(role, wire.content, timestamp))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListBody {
    #[serde(default)]
    pub users: Vec<ProfileSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileBody<'a> {
    pub profile_data: &'a Profile,
}

/// Error body shape of the remote API
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}
