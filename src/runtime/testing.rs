//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use crate::client::{ClientError, ProfileStore, Reply, SessionClient, SessionId};
use crate::profile::{BasicInfo, Profile, ProfileSummary, UserRecord};
use crate::transcript::Message;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Mock Backend
// ============================================================================

/// Scripted backend: queued results, optional gates to hold calls open, and
/// a record of every call made.
#[allow(dead_code)]
pub struct MockBackend {
    profiles: Mutex<HashMap<String, UserRecord>>,
    start_results: Mutex<VecDeque<Result<SessionId, ClientError>>>,
    send_results: Mutex<VecDeque<Result<Reply, ClientError>>>,
    start_gate: Option<Semaphore>,
    send_gate: Option<Semaphore>,
    end_delay: Option<Duration>,
    sessions_issued: AtomicUsize,
    completed_sends: AtomicUsize,
    /// Subjects passed to `start_session`
    pub starts: Mutex<Vec<String>>,
    /// Text and session id of every `send_message` call, recorded on entry
    pub sent: Mutex<Vec<(String, Option<SessionId>)>>,
    pub ended: Mutex<Vec<SessionId>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            start_results: Mutex::new(VecDeque::new()),
            send_results: Mutex::new(VecDeque::new()),
            start_gate: None,
            send_gate: None,
            end_delay: None,
            sessions_issued: AtomicUsize::new(0),
            completed_sends: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
        }
    }

    /// Register a subject whose profile carries `name`
    pub fn with_profile(self, subject_id: &str, name: &str) -> Self {
        let record = UserRecord {
            id: subject_id.to_string(),
            profile_data: Profile {
                basic_info: BasicInfo {
                    name: name.to_string(),
                    ..BasicInfo::default()
                },
                ..Profile::default()
            },
            created_at: None,
            updated_at: None,
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(subject_id.to_string(), record);
        self
    }

    /// Hold every `start_session` call until released
    pub fn gated_starts(mut self) -> Self {
        self.start_gate = Some(Semaphore::new(0));
        self
    }

    /// Hold every `send_message` call until released
    pub fn gated_sends(mut self) -> Self {
        self.send_gate = Some(Semaphore::new(0));
        self
    }

    /// Make every `end_session` call take `delay` after it is recorded
    pub fn with_slow_end(mut self, delay: Duration) -> Self {
        self.end_delay = Some(delay);
        self
    }

    pub fn release_starts(&self, count: usize) {
        if let Some(gate) = &self.start_gate {
            gate.add_permits(count);
        }
    }

    pub fn release_sends(&self, count: usize) {
        if let Some(gate) = &self.send_gate {
            gate.add_permits(count);
        }
    }

    pub fn queue_start(&self, result: Result<SessionId, ClientError>) {
        self.start_results.lock().unwrap().push_back(result);
    }

    pub fn queue_reply(&self, text: &str, session_id: Option<&str>) {
        self.send_results.lock().unwrap().push_back(Ok(Reply {
            text: text.to_string(),
            timestamp: Utc::now(),
            session_id: session_id.map(SessionId::new),
        }));
    }

    pub fn queue_send_error(&self, error: ClientError) {
        self.send_results.lock().unwrap().push_back(Err(error));
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn sent_messages(&self) -> Vec<(String, Option<SessionId>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn ended_sessions(&self) -> Vec<SessionId> {
        self.ended.lock().unwrap().clone()
    }

    /// Sends that have returned a result to the caller
    pub fn completed_sends(&self) -> usize {
        self.completed_sends.load(Ordering::SeqCst)
    }
}

async fn pass(gate: Option<&Semaphore>) {
    if let Some(gate) = gate {
        gate.acquire().await.unwrap().forget();
    }
}

#[async_trait]
impl SessionClient for MockBackend {
    async fn start_session(&self, subject_id: &str) -> Result<SessionId, ClientError> {
        self.starts.lock().unwrap().push(subject_id.to_string());
        pass(self.start_gate.as_ref()).await;

        let queued = self.start_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            let n = self.sessions_issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SessionId::new(format!("session-{n}")))
        })
    }

    async fn send_message(
        &self,
        _subject_id: &str,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Reply, ClientError> {
        self.sent
            .lock()
            .unwrap()
            .push((text.to_string(), session_id.cloned()));
        pass(self.send_gate.as_ref()).await;

        let result = self
            .send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("No mock response queued")));
        self.completed_sends.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn fetch_history(&self, _session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        Ok(Vec::new())
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        self.ended.lock().unwrap().push(session_id.clone());
        if let Some(delay) = self.end_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MockBackend {
    async fn get_profile(&self, subject_id: &str) -> Result<UserRecord, ClientError> {
        self.profiles
            .lock()
            .unwrap()
            .get(subject_id)
            .cloned()
            .ok_or_else(|| ClientError::service(404, "User not found"))
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, ClientError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .values()
            .map(|record| ProfileSummary {
                id: record.id.clone(),
                name: record.profile_data.basic_info.name.clone(),
            })
            .collect())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<UserRecord, ClientError> {
        let mut profiles = self.profiles.lock().unwrap();
        let id = (profiles.len() + 1).to_string();
        let record = UserRecord {
            id: id.clone(),
            profile_data: profile.clone(),
            created_at: None,
            updated_at: None,
        };
        profiles.insert(id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        subject_id: &str,
        profile: &Profile,
    ) -> Result<UserRecord, ClientError> {
        let mut profiles = self.profiles.lock().unwrap();
        let record = profiles
            .get_mut(subject_id)
            .ok_or_else(|| ClientError::service(404, "User not found"))?;
        record.profile_data = profile.clone();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{InterviewHandle, Snapshot, UiEvent};
    use crate::state_machine::{ConvContext, Phase};
    use crate::transcript::{ChatSurface, Role, SEND_FAILED_NOTICE};
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(2);

    fn spawn(backend: &Arc<MockBackend>) -> InterviewHandle {
        InterviewHandle::spawn(
            ConvContext::new("1", ChatSurface::Interview),
            Arc::clone(backend),
        )
    }

    async fn wait_until<F>(handle: &InterviewHandle, predicate: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut updates = handle.updates();
        let result = tokio::time::timeout(WAIT, updates.wait_for(predicate)).await;
        match result {
            Ok(Ok(snapshot)) => snapshot.clone(),
            Ok(Err(_)) => panic!("runtime stopped"),
            Err(_) => panic!("timed out, last snapshot: {:?}", handle.snapshot()),
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !check() {
            assert!(tokio::time::Instant::now() < deadline, "condition never held");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn ready(backend: &Arc<MockBackend>) -> InterviewHandle {
        let handle = spawn(backend);
        handle.initialize().await.unwrap();
        wait_until(&handle, |s| s.phase == Phase::Ready).await;
        handle
    }

    #[tokio::test]
    async fn test_initialize_greets_by_name() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        let handle = ready(&backend).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(snapshot.transcript[0].role, Role::Counterpart);
        assert!(snapshot.transcript[0].content.contains("Ada"));
        assert_eq!(snapshot.session_id, Some(SessionId::new("session-1")));
        assert_eq!(snapshot.subject_name.as_deref(), Some("Ada"));
        assert!(!snapshot.awaiting_reply);
    }

    #[tokio::test]
    async fn test_missing_profile_fails_before_starting() {
        let backend = Arc::new(MockBackend::new());
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();

        let snapshot = wait_until(&handle, |s| s.phase == Phase::Failed).await;
        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(snapshot.transcript[0].role, Role::System);
        assert!(snapshot.session_id.is_none());
        assert_eq!(backend.start_count(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_seeds_notice() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_start(Err(ClientError::transport("connection refused")));
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();

        let snapshot = wait_until(&handle, |s| s.phase == Phase::Failed).await;
        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(snapshot.transcript[0].role, Role::System);
        assert!(snapshot.session_id.is_none());
    }

    #[tokio::test]
    async fn test_double_initialize_starts_once() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();
        handle.initialize().await.unwrap();
        wait_until(&handle, |s| s.phase == Phase::Ready).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(backend.start_count(), 1);
        assert_eq!(handle.snapshot().transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_send_is_noop() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_reply("Hello there.", None);
        let handle = ready(&backend).await;

        handle.send("").await.unwrap();
        handle.send("   ").await.unwrap();
        handle.send("real question").await.unwrap();

        let snapshot = wait_until(&handle, |s| s.transcript.len() == 3 && !s.awaiting_reply).await;
        let sent = backend.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "real question");
        assert_eq!(snapshot.transcript[1].content, "real question");
    }

    #[tokio::test]
    async fn test_send_appends_both_sides() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_reply("I build ML systems.", None);
        let handle = ready(&backend).await;

        handle.send("  Tell me about yourself  ").await.unwrap();
        let snapshot = wait_until(&handle, |s| s.transcript.len() == 3 && !s.awaiting_reply).await;

        assert_eq!(snapshot.transcript[1].role, Role::Primary);
        assert_eq!(snapshot.transcript[1].content, "Tell me about yourself");
        assert_eq!(snapshot.transcript[2].role, Role::Counterpart);
        assert_eq!(snapshot.transcript[2].content, "I build ML systems.");
        assert_eq!(
            backend.sent_messages()[0].1,
            Some(SessionId::new("session-1"))
        );
        assert_eq!(snapshot.phase, Phase::Ready);
    }

    #[tokio::test]
    async fn test_send_failure_appends_notice_and_keeps_session() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_send_error(ClientError::transport("timed out"));
        let handle = ready(&backend).await;

        handle.send("Hello").await.unwrap();
        let snapshot = wait_until(&handle, |s| s.transcript.len() == 3 && !s.awaiting_reply).await;

        let last = snapshot.transcript.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, SEND_FAILED_NOTICE);
        assert_eq!(snapshot.session_id, Some(SessionId::new("session-1")));
        assert_eq!(snapshot.phase, Phase::Ready);
    }

    #[tokio::test]
    async fn test_send_while_pending_is_noop() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada").gated_sends());
        backend.queue_reply("first answer", None);
        let handle = ready(&backend).await;

        handle.send("one").await.unwrap();
        wait_until(&handle, |s| s.awaiting_reply).await;
        handle.send("two").await.unwrap();
        handle.send("three").await.unwrap();
        // Let the runtime drain the queued commands before the reply lands
        tokio::time::sleep(Duration::from_millis(50)).await;

        backend.release_sends(1);
        let snapshot = wait_until(&handle, |s| !s.awaiting_reply && s.transcript.len() >= 3).await;

        assert_eq!(backend.sent_messages().len(), 1);
        assert_eq!(snapshot.transcript.len(), 3);
        assert_eq!(snapshot.transcript[2].content, "first answer");
    }

    #[tokio::test]
    async fn test_reply_session_id_rotates() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_reply("first", Some("rotated"));
        backend.queue_reply("second", None);
        let handle = ready(&backend).await;

        handle.send("a").await.unwrap();
        let snapshot = wait_until(&handle, |s| s.transcript.len() == 3 && !s.awaiting_reply).await;
        assert_eq!(snapshot.session_id, Some(SessionId::new("rotated")));

        handle.send("b").await.unwrap();
        wait_until(&handle, |s| s.transcript.len() == 5 && !s.awaiting_reply).await;

        let sent = backend.sent_messages();
        assert_eq!(sent[1].1, Some(SessionId::new("rotated")));
    }

    #[tokio::test]
    async fn test_reset_while_sending_discards_late_reply() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada").gated_sends());
        backend.queue_reply("late answer", None);
        let handle = ready(&backend).await;

        handle.send("question").await.unwrap();
        wait_until(&handle, |s| s.awaiting_reply).await;

        handle.reset().await.unwrap();
        let snapshot = wait_until(&handle, |s| {
            s.phase == Phase::Ready && s.session_id == Some(SessionId::new("session-2"))
        })
        .await;
        assert_eq!(snapshot.transcript.len(), 1);
        assert_eq!(backend.ended_sessions(), vec![SessionId::new("session-1")]);

        backend.release_sends(1);
        eventually(|| backend.completed_sends() == 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let after = handle.snapshot();
        assert_eq!(after, snapshot);
        assert!(after.transcript.iter().all(|m| m.content != "late answer"));
    }

    #[tokio::test]
    async fn test_reset_emits_clear_before_greeting() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        let handle = ready(&backend).await;
        let mut events = handle.subscribe();

        handle.reset().await.unwrap();
        wait_until(&handle, |s| {
            s.phase == Phase::Ready && s.session_id == Some(SessionId::new("session-2"))
        })
        .await;

        let mut cleared = false;
        let mut greeted_after_clear = false;
        while let Ok(event) = events.try_recv() {
            match event {
                UiEvent::TranscriptCleared => cleared = true,
                UiEvent::MessageAppended { message } if cleared => {
                    greeted_after_clear = message.role == Role::Counterpart;
                }
                _ => {}
            }
        }
        assert!(cleared);
        assert!(greeted_after_clear);
    }

    #[tokio::test]
    async fn test_teardown_ends_session_once() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        let handle = ready(&backend).await;

        handle.teardown().await;

        assert_eq!(backend.ended_sessions(), vec![SessionId::new("session-1")]);
    }

    #[tokio::test]
    async fn test_teardown_before_start_completes_ends_orphan() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada").gated_starts());
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();
        eventually(|| backend.start_count() == 1).await;

        handle.teardown().await;
        assert!(backend.ended_sessions().is_empty());

        backend.release_starts(1);
        eventually(|| backend.ended_sessions() == vec![SessionId::new("session-1")]).await;
    }

    #[tokio::test]
    async fn test_reset_does_not_wait_for_slow_end_session() {
        let backend = Arc::new(
            MockBackend::new()
                .with_profile("1", "Ada")
                .gated_starts()
                .with_slow_end(Duration::from_secs(30)),
        );
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();
        backend.release_starts(1);
        wait_until(&handle, |s| s.phase == Phase::Ready).await;

        handle.reset().await.unwrap();
        let snapshot = wait_until(&handle, |s| s.phase == Phase::Initializing).await;
        assert!(snapshot.transcript.is_empty());
        assert!(snapshot.session_id.is_none());
        eventually(|| backend.ended_sessions() == vec![SessionId::new("session-1")]).await;

        backend.release_starts(1);
        let snapshot = wait_until(&handle, |s| s.phase == Phase::Ready).await;
        assert_eq!(snapshot.session_id, Some(SessionId::new("session-2")));
        assert_eq!(snapshot.transcript.len(), 1);

        handle.send("still responsive?").await.unwrap();
        wait_until(&handle, |s| s.transcript.len() == 3).await;
        assert_eq!(backend.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_while_initializing_ends_orphaned_session() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada").gated_starts());
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();
        eventually(|| backend.start_count() == 1).await;

        handle.reset().await.unwrap();
        eventually(|| backend.start_count() == 2).await;

        // The first start finishes after the reset superseded it
        backend.release_starts(1);
        eventually(|| backend.ended_sessions() == vec![SessionId::new("session-1")]).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, Phase::Initializing);
        assert!(snapshot.transcript.is_empty());
        assert!(snapshot.session_id.is_none());

        backend.release_starts(1);
        let snapshot = wait_until(&handle, |s| s.phase == Phase::Ready).await;
        assert_eq!(snapshot.session_id, Some(SessionId::new("session-2")));
        assert_eq!(snapshot.transcript.len(), 1);
        assert!(snapshot.transcript[0].content.contains("Ada"));
        assert_eq!(backend.ended_sessions(), vec![SessionId::new("session-1")]);
    }

    #[tokio::test]
    async fn test_teardown_waits_for_pending_end_session() {
        let backend = Arc::new(
            MockBackend::new()
                .with_profile("1", "Ada")
                .with_slow_end(Duration::from_millis(100)),
        );
        let handle = ready(&backend).await;
        let updates = handle.updates();

        handle.teardown().await;

        assert_eq!(updates.borrow().phase, Phase::TornDown);
        assert_eq!(backend.ended_sessions(), vec![SessionId::new("session-1")]);
    }

    #[tokio::test]
    async fn test_dropping_handle_tears_down() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        let handle = ready(&backend).await;

        drop(handle);

        eventually(|| backend.ended_sessions() == vec![SessionId::new("session-1")]).await;
    }

    #[tokio::test]
    async fn test_send_from_failed_state_is_dispatched() {
        let backend = Arc::new(MockBackend::new().with_profile("1", "Ada"));
        backend.queue_start(Err(ClientError::service(500, "boom")));
        backend.queue_reply("recovered", Some("late-session"));
        let handle = spawn(&backend);
        handle.initialize().await.unwrap();
        wait_until(&handle, |s| s.phase == Phase::Failed).await;

        handle.send("anyone there?").await.unwrap();
        let snapshot = wait_until(&handle, |s| s.phase == Phase::Ready).await;

        assert_eq!(backend.sent_messages()[0].1, None);
        assert_eq!(snapshot.session_id, Some(SessionId::new("late-session")));
        assert_eq!(snapshot.transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_profile_store() {
        let backend = MockBackend::new().with_profile("1", "Ada");
        let mut profile = backend.get_profile("1").await.unwrap().profile_data;
        profile.basic_info.name = "Grace".to_string();
        backend.update_profile("1", &profile).await.unwrap();

        let listed = backend.list_profiles().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Grace");
        assert!(backend.get_profile("2").await.unwrap_err().is_not_found());
    }
}
