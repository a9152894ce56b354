//! Interview runtime executor

use super::{Snapshot, UiEvent};
use crate::client::{ClientError, InterviewBackend, SessionId};
use crate::state_machine::{transition, ConvContext, ConvState, Effect, Event, Generation};
use crate::transcript::Transcript;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;

/// Event loop for one conversation, generic over the backend
pub struct InterviewRuntime<B>
where
    B: InterviewBackend + 'static,
{
    context: ConvContext,
    state: ConvState,
    transcript: Transcript,
    backend: Arc<B>,
    /// Lifecycle commands from the view
    command_rx: mpsc::Receiver<Event>,
    /// Results of spawned calls
    result_tx: mpsc::Sender<Event>,
    result_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<UiEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
    /// Best-effort session ends still running; drained before the loop exits
    end_tasks: JoinSet<()>,
}

impl<B> InterviewRuntime<B>
where
    B: InterviewBackend + 'static,
{
    pub fn new(
        context: ConvContext,
        backend: B,
        command_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<UiEvent>,
        snapshot_tx: watch::Sender<Snapshot>,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::channel(32);
        Self {
            context,
            state: ConvState::default(),
            transcript: Transcript::new(),
            backend: Arc::new(backend),
            command_rx,
            result_tx,
            result_rx,
            broadcast_tx,
            snapshot_tx,
            end_tasks: JoinSet::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(subject = %self.context.subject_id, surface = %self.context.surface, "Starting interview runtime");

        while !self.state.phase.is_terminal() {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(event) => self.process_event(event),
                        // View went away without tearing down
                        None => self.process_event(Event::Teardown),
                    }
                }
                Some(event) = self.result_rx.recv() => {
                    self.process_event(event);
                }
                Some(joined) = self.end_tasks.join_next(), if !self.end_tasks.is_empty() => {
                    log_join_failure(joined);
                }
            }
        }

        while let Some(joined) = self.end_tasks.join_next().await {
            log_join_failure(joined);
        }

        tracing::info!(subject = %self.context.subject_id, "Interview runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(event = name, phase = %self.state.phase, reason = %e, "Event ignored");
                return;
            }
        };

        let previous_session = self.state.session_id.clone();
        self.state = result.new_state;
        if let Some(session_id) = &self.state.session_id {
            if previous_session.as_ref() != Some(session_id) {
                tracing::info!(session_id = %session_id, generation = %self.state.generation, "Session id updated");
            }
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage(message) => {
                self.transcript.push(message.clone());
                let _ = self.broadcast_tx.send(UiEvent::MessageAppended { message });
            }
            Effect::ClearTranscript => {
                self.transcript.clear();
                let _ = self.broadcast_tx.send(UiEvent::TranscriptCleared);
            }
            Effect::StartSession { generation } => self.spawn_start(generation),
            Effect::SendMessage {
                generation,
                text,
                session_id,
            } => self.spawn_send(generation, text, session_id),
            Effect::EndSession { session_id } => self.spawn_end(session_id),
            Effect::NotifyState => self.publish(),
        }
    }

    fn spawn_start(&self, generation: Generation) {
        let backend = Arc::clone(&self.backend);
        let subject = self.context.subject_id.clone();
        let result_tx = self.result_tx.clone();

        tokio::spawn(async move {
            let event = match start_with_profile(backend.as_ref(), &subject).await {
                Ok((session_id, subject_name)) => Event::SessionStarted {
                    generation,
                    session_id,
                    subject_name,
                    at: Utc::now(),
                },
                Err(e) => {
                    tracing::warn!(
                        subject = %subject,
                        generation = %generation,
                        kind = e.kind.as_str(),
                        error = %e,
                        "Failed to start session"
                    );
                    Event::InitFailed {
                        generation,
                        at: Utc::now(),
                    }
                }
            };

            // The runtime stopped while the start was in flight
            if let Err(SendError(Event::SessionStarted { session_id, .. })) =
                result_tx.send(event).await
            {
                tracing::debug!(session_id = %session_id, "Ending session started after teardown");
                end_session_quietly(backend.as_ref(), &session_id).await;
            }
        });
    }

    fn spawn_end(&mut self, session_id: SessionId) {
        let backend = Arc::clone(&self.backend);
        self.end_tasks.spawn(async move {
            end_session_quietly(backend.as_ref(), &session_id).await;
        });
    }

    fn spawn_send(&self, generation: Generation, text: String, session_id: Option<SessionId>) {
        let backend = Arc::clone(&self.backend);
        let subject = self.context.subject_id.clone();
        let result_tx = self.result_tx.clone();

        tokio::spawn(async move {
            let event = match backend
                .send_message(&subject, &text, session_id.as_ref())
                .await
            {
                Ok(reply) => Event::ReplyReceived { generation, reply },
                Err(e) => {
                    tracing::warn!(
                        subject = %subject,
                        generation = %generation,
                        kind = e.kind.as_str(),
                        error = %e,
                        "Failed to send message"
                    );
                    Event::SendFailed {
                        generation,
                        at: Utc::now(),
                    }
                }
            };
            if result_tx.send(event).await.is_err() {
                tracing::debug!(generation = %generation, "Runtime stopped, dropping reply");
            }
        });
    }

    fn publish(&self) {
        let snapshot = Snapshot {
            phase: self.state.phase,
            awaiting_reply: self.state.awaiting_reply(),
            session_id: self.state.session_id.clone(),
            subject_name: self.state.subject_name.clone(),
            transcript: self.transcript.messages().to_vec(),
        };
        self.snapshot_tx.send_replace(snapshot);

        let _ = self.broadcast_tx.send(UiEvent::StateChange {
            phase: self.state.phase,
            awaiting_reply: self.state.awaiting_reply(),
            session_id: self.state.session_id.clone(),
        });
    }
}

fn log_join_failure(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "End session task failed");
    }
}

/// Read the subject's profile, then open a session for it
async fn start_with_profile<B>(
    backend: &B,
    subject: &str,
) -> Result<(SessionId, Option<String>), ClientError>
where
    B: InterviewBackend + ?Sized,
{
    let user = backend.get_profile(subject).await?;
    let session_id = backend.start_session(subject).await?;
    Ok((session_id, user.profile_data.display_name().map(String::from)))
}

async fn end_session_quietly<B>(backend: &B, session_id: &SessionId)
where
    B: InterviewBackend + ?Sized,
{
    match backend.end_session(session_id).await {
        Ok(()) => tracing::debug!(session_id = %session_id, "Session ended"),
        Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Failed to end session"),
    }
}
