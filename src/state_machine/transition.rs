//! Pure state transition function
//!
//! Given the same state, context and event this always yields the same new
//! state and effects. All I/O happens in the runtime.

use super::state::{Generation, Phase};
use super::{ConvContext, ConvState, Effect, Event};
use crate::transcript::{Message, INIT_FAILED_NOTICE, SEND_FAILED_NOTICE};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the machine declines. None of these reach the user; the runtime
/// logs them and leaves state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still pending")]
    Busy,
    #[error("Not accepting input while {0}")]
    NotReady(Phase),
    #[error("Already initialized (phase {0})")]
    AlreadyInitialized(Phase),
    #[error("Discarded stale {event} from generation {issued} (current {current})")]
    StaleResponse {
        event: &'static str,
        issued: Generation,
        current: Generation,
    },
    #[error("Conversation is torn down, ignoring {0}")]
    TornDown(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if let Some(issued) = event.generation() {
        if issued != state.generation {
            return discard_stale(state, event, issued);
        }
    }

    match (state.phase, event) {
        // ============================================================
        // Teardown
        // ============================================================
        (Phase::TornDown, Event::Teardown) => Ok(TransitionResult::new(state.clone())),

        (Phase::TornDown, event) => Err(TransitionError::TornDown(event.name())),

        (_, Event::Teardown) => {
            let new_state = ConvState {
                phase: Phase::TornDown,
                session_id: None,
                generation: state.generation.next(),
                subject_name: state.subject_name.clone(),
            };
            Ok(TransitionResult::new(new_state)
                .with_effects(Effect::end_session(state.session_id.as_ref()))
                .with_effect(Effect::NotifyState))
        }

        // ============================================================
        // Reset: end the old session, start over with a clean transcript
        // ============================================================
        (_, Event::Reset) => {
            let generation = state.generation.next();
            let new_state = ConvState {
                phase: Phase::Initializing,
                session_id: None,
                generation,
                subject_name: None,
            };
            Ok(TransitionResult::new(new_state)
                .with_effects(Effect::end_session(state.session_id.as_ref()))
                .with_effect(Effect::ClearTranscript)
                .with_effect(Effect::StartSession { generation })
                .with_effect(Effect::NotifyState))
        }

        // ============================================================
        // Initialization
        // ============================================================
        (Phase::Uninitialized, Event::Initialize) => {
            let new_state = ConvState {
                phase: Phase::Initializing,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::StartSession {
                    generation: state.generation,
                })
                .with_effect(Effect::NotifyState))
        }

        (phase, Event::Initialize) => Err(TransitionError::AlreadyInitialized(phase)),

        (
            Phase::Initializing,
            Event::SessionStarted {
                session_id,
                subject_name,
                at,
                ..
            },
        ) => {
            let greeting = context.surface.greeting(subject_name.as_deref());
            let new_state = ConvState {
                phase: Phase::Ready,
                session_id: Some(session_id),
                generation: state.generation,
                subject_name,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::counterpart(greeting, at)))
                .with_effect(Effect::NotifyState))
        }

        (Phase::Initializing, Event::InitFailed { at, .. }) => {
            let new_state = ConvState {
                phase: Phase::Failed,
                session_id: None,
                generation: state.generation,
                subject_name: None,
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::notice(INIT_FAILED_NOTICE, at)))
                .with_effect(Effect::NotifyState))
        }

        // ============================================================
        // Message exchange: at most one send in flight
        // ============================================================
        (Phase::Sending, Event::UserMessage { .. }) => Err(TransitionError::Busy),

        (phase, Event::UserMessage { text, at }) if phase.accepts_input() => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let new_state = ConvState {
                phase: Phase::Sending,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::primary(text, at)))
                .with_effect(Effect::SendMessage {
                    generation: state.generation,
                    text: text.to_string(),
                    session_id: state.session_id.clone(),
                })
                .with_effect(Effect::NotifyState))
        }

        (phase, Event::UserMessage { .. }) => Err(TransitionError::NotReady(phase)),

        (Phase::Sending, Event::ReplyReceived { reply, .. }) => {
            // The reply's session id is authoritative when present
            let session_id = reply.session_id.or_else(|| state.session_id.clone());
            let new_state = ConvState {
                phase: Phase::Ready,
                session_id,
                generation: state.generation,
                subject_name: state.subject_name.clone(),
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::counterpart(
                    reply.text,
                    reply.timestamp,
                )))
                .with_effect(Effect::NotifyState))
        }

        (Phase::Sending, Event::SendFailed { at, .. }) => {
            let new_state = ConvState {
                phase: Phase::Ready,
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::notice(SEND_FAILED_NOTICE, at)))
                .with_effect(Effect::NotifyState))
        }

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {phase}",
            event.name()
        ))),
    }
}

/// A result from a superseded generation never touches the transcript.
/// A session that finished starting after a reset is orphaned on the
/// server, so it is ended.
fn discard_stale(
    state: &ConvState,
    event: Event,
    issued: Generation,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::SessionStarted { session_id, .. } => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::EndSession { session_id })),
        event => Err(TransitionError::StaleResponse {
            event: event.name(),
            issued,
            current: state.generation,
        }),
    }
}
