//! Effects produced by state transitions

use super::state::Generation;
use crate::client::SessionId;
use crate::transcript::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append one entry to the transcript
    AppendMessage(Message),

    /// Discard the whole transcript (reset only)
    ClearTranscript,

    /// Read the subject's profile, then start a session
    StartSession { generation: Generation },

    /// Deliver one utterance
    SendMessage {
        generation: Generation,
        text: String,
        session_id: Option<SessionId>,
    },

    /// Best-effort server-side teardown; failure is logged only
    EndSession { session_id: SessionId },

    /// Publish the new state to the view
    NotifyState,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn end_session(session_id: Option<&SessionId>) -> Option<Self> {
        session_id.map(|id| Effect::EndSession {
            session_id: id.clone(),
        })
    }
}
