//! Remote API abstraction
//!
//! Every persistence and AI concern lives behind these traits. The client
//! never handles errors itself; every failure is handed to the caller.

mod error;
mod http;
mod types;

pub use error::{ClientError, ClientErrorKind};
pub use http::HttpApiClient;
pub use types::{Reply, SessionId};

use crate::profile::{Profile, ProfileSummary, UserRecord};
use crate::transcript::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// The four session round trips against the chat backend
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Begin a conversation impersonating `subject_id`
    async fn start_session(&self, subject_id: &str) -> Result<SessionId, ClientError>;

    /// Deliver one utterance and return the counterpart's reply.
    ///
    /// `session_id` may be `None` when no session exists yet.
    async fn send_message(
        &self,
        subject_id: &str,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Reply, ClientError>;

    /// Read back the server's transcript
    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError>;

    /// Best-effort teardown of a server session
    async fn end_session(&self, session_id: &SessionId) -> Result<(), ClientError>;
}

/// Profile persistence store
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, subject_id: &str) -> Result<UserRecord, ClientError>;

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, ClientError>;

    async fn create_profile(&self, profile: &Profile) -> Result<UserRecord, ClientError>;

    async fn update_profile(
        &self,
        subject_id: &str,
        profile: &Profile,
    ) -> Result<UserRecord, ClientError>;
}

/// Everything the conversation runtime needs from the backend
pub trait InterviewBackend: SessionClient + ProfileStore {}
impl<T: SessionClient + ProfileStore> InterviewBackend for T {}

pub(crate) fn require_subject(subject_id: &str) -> Result<(), ClientError> {
    if subject_id.trim().is_empty() {
        return Err(ClientError::invalid_input("subject id must not be empty"));
    }
    Ok(())
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionClient + ?Sized> SessionClient for Arc<T> {
    async fn start_session(&self, subject_id: &str) -> Result<SessionId, ClientError> {
        (**self).start_session(subject_id).await
    }

    async fn send_message(
        &self,
        subject_id: &str,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Reply, ClientError> {
        (**self).send_message(subject_id, text, session_id).await
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        (**self).fetch_history(session_id).await
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        (**self).end_session(session_id).await
    }
}

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn get_profile(&self, subject_id: &str) -> Result<UserRecord, ClientError> {
        (**self).get_profile(subject_id).await
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, ClientError> {
        (**self).list_profiles().await
    }

    async fn create_profile(&self, profile: &Profile) -> Result<UserRecord, ClientError> {
        (**self).create_profile(profile).await
    }

    async fn update_profile(
        &self,
        subject_id: &str,
        profile: &Profile,
    ) -> Result<UserRecord, ClientError> {
        (**self).update_profile(subject_id, profile).await
    }
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logs every call with its duration and outcome
pub struct LoggingClient<C> {
    inner: C,
}

impl<C> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &'static str, started: Instant, result: &Result<T, ClientError>) {
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => tracing::debug!(operation, duration_ms = %duration_ms, "API call completed"),
        Err(e) => tracing::warn!(
            operation,
            duration_ms = %duration_ms,
            kind = e.kind.as_str(),
            status = ?e.status,
            error = %e.message,
            "API call failed"
        ),
    }
}

#[async_trait]
impl<C: SessionClient> SessionClient for LoggingClient<C> {
    async fn start_session(&self, subject_id: &str) -> Result<SessionId, ClientError> {
        let started = Instant::now();
        let result = self.inner.start_session(subject_id).await;
        log_outcome("start_session", started, &result);
        if let Ok(session_id) = &result {
            tracing::info!(subject = %subject_id, session_id = %session_id, "Session started");
        }
        result
    }

    async fn send_message(
        &self,
        subject_id: &str,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Reply, ClientError> {
        let started = Instant::now();
        let result = self.inner.send_message(subject_id, text, session_id).await;
        log_outcome("send_message", started, &result);
        result
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        let started = Instant::now();
        let result = self.inner.fetch_history(session_id).await;
        log_outcome("fetch_history", started, &result);
        result
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        let started = Instant::now();
        let result = self.inner.end_session(session_id).await;
        log_outcome("end_session", started, &result);
        result
    }
}

#[async_trait]
impl<C: ProfileStore> ProfileStore for LoggingClient<C> {
    async fn get_profile(&self, subject_id: &str) -> Result<UserRecord, ClientError> {
        let started = Instant::now();
        let result = self.inner.get_profile(subject_id).await;
        log_outcome("get_profile", started, &result);
        result
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, ClientError> {
        let started = Instant::now();
        let result = self.inner.list_profiles().await;
        log_outcome("list_profiles", started, &result);
        result
    }

    async fn create_profile(&self, profile: &Profile) -> Result<UserRecord, ClientError> {
        let started = Instant::now();
        let result = self.inner.create_profile(profile).await;
        log_outcome("create_profile", started, &result);
        result
    }

    async fn update_profile(
        &self,
        subject_id: &str,
        profile: &Profile,
    ) -> Result<UserRecord, ClientError> {
        let started = Instant::now();
        let result = self.inner.update_profile(subject_id, profile).await;
        log_outcome("update_profile", started, &result);
        result
    }
}
