//! Events that can occur in a conversation

use super::state::Generation;
use crate::client::{Reply, SessionId};
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle commands from the view
    Initialize,
    UserMessage {
        text: String,
        /// Client-side time the message was entered
        at: DateTime<Utc>,
    },
    Reset,
    Teardown,

    // Results of calls issued under `generation`
    SessionStarted {
        generation: Generation,
        session_id: SessionId,
        subject_name: Option<String>,
        at: DateTime<Utc>,
    },
    InitFailed {
        generation: Generation,
        at: DateTime<Utc>,
    },
    ReplyReceived {
        generation: Generation,
        reply: Reply,
    },
    SendFailed {
        generation: Generation,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage {
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Generation a result event was issued under; `None` for commands
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Event::SessionStarted { generation, .. }
            | Event::InitFailed { generation, .. }
            | Event::ReplyReceived { generation, .. }
            | Event::SendFailed { generation, .. } => Some(*generation),
            Event::Initialize | Event::UserMessage { .. } | Event::Reset | Event::Teardown => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialize => "initialize",
            Event::UserMessage { .. } => "user_message",
            Event::Reset => "reset",
            Event::Teardown => "teardown",
            Event::SessionStarted { .. } => "session_started",
            Event::InitFailed { .. } => "init_failed",
            Event::ReplyReceived { .. } => "reply_received",
            Event::SendFailed { .. } => "send_failed",
        }
    }
}
