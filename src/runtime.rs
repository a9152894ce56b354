//! Runtime for executing interview conversations
//!
//! One runtime task per mounted view. It is the only owner of the
//! transcript and session id; the view talks to it through an
//! [`InterviewHandle`].

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::InterviewRuntime;

use crate::client::{InterviewBackend, SessionId};
use crate::state_machine::{ConvContext, Event, Phase};
use crate::transcript::Message;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Events sent to the view
#[derive(Debug, Clone)]
pub enum UiEvent {
    MessageAppended {
        message: Message,
    },
    TranscriptCleared,
    StateChange {
        phase: Phase,
        awaiting_reply: bool,
        session_id: Option<SessionId>,
    },
}

/// Read-only view of the conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub awaiting_reply: bool,
    /// Display/debug only
    pub session_id: Option<SessionId>,
    pub subject_name: Option<String>,
    pub transcript: Vec<Message>,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Interview runtime has stopped")]
    Closed,
}

/// Handle to interact with a running conversation
pub struct InterviewHandle {
    command_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<UiEvent>,
    snapshot_rx: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl InterviewHandle {
    /// Start a runtime for one view. Must be called inside a tokio runtime.
    pub fn spawn<B>(context: ConvContext, backend: B) -> Self
    where
        B: InterviewBackend + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let runtime = InterviewRuntime::new(
            context,
            backend,
            command_rx,
            broadcast_tx.clone(),
            snapshot_tx,
        );
        let task = tokio::spawn(runtime.run());

        Self {
            command_tx,
            broadcast_tx,
            snapshot_rx,
            task,
        }
    }

    pub async fn initialize(&self) -> Result<(), RuntimeError> {
        self.command(Event::Initialize).await
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Event::user_message(text)).await
    }

    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.command(Event::Reset).await
    }

    /// End the conversation and wait for the runtime to stop. Never fails;
    /// dropping the handle has the same effect without waiting.
    pub async fn teardown(self) {
        let Self {
            command_tx, task, ..
        } = self;
        if command_tx.send(Event::Teardown).await.is_err() {
            tracing::debug!("Runtime already stopped before teardown");
        }
        drop(command_tx);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Interview runtime task failed");
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot
    pub fn updates(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.broadcast_tx.subscribe()
    }

    async fn command(&self, event: Event) -> Result<(), RuntimeError> {
        self.command_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}
