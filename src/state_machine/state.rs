//! Conversation state types

use crate::client::SessionId;
use crate::transcript::ChatSurface;
use serde::Serialize;
use std::fmt;

/// Lifecycle phase of one interview view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing started yet
    #[default]
    Uninitialized,
    /// Fetching the profile and starting a session
    Initializing,
    /// Waiting for input
    Ready,
    /// One message in flight
    Sending,
    /// Initialization failed; input is still accepted
    Failed,
    /// View discarded, terminal
    TornDown,
}

impl Phase {
    /// Whether a user message would be dispatched in this phase
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::TornDown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initializing => "initializing",
            Phase::Ready => "ready",
            Phase::Sending => "sending",
            Phase::Failed => "failed",
            Phase::TornDown => "torn_down",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session epoch. Bumped by Reset and Teardown so that replies issued under
/// an older epoch are recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable conversation state, excluding the transcript itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvState {
    pub phase: Phase,
    pub session_id: Option<SessionId>,
    pub generation: Generation,
    /// Display name of the subject, once the profile has been read
    pub subject_name: Option<String>,
}

impl ConvState {
    /// The "awaiting reply" flag shown to the presentation layer
    pub fn awaiting_reply(&self) -> bool {
        self.phase == Phase::Sending
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub subject_id: String,
    pub surface: ChatSurface,
}

impl ConvContext {
    pub fn new(subject_id: impl Into<String>, surface: ChatSurface) -> Self {
        Self {
            subject_id: subject_id.into(),
            surface,
        }
    }
}
