//! HTTP binding of the remote API

use super::types::{
    ChatRequestBody, ChatResponseBody, ErrorBody, HistoryBody, ProfileBody, StartSessionBody,
    UserListBody,
};
use super::{require_subject, ClientError, ProfileStore, Reply, SessionClient, SessionId};
use crate::config::ClientConfig;
use crate::profile::{Profile, ProfileSummary, UserRecord};
use crate::transcript::Message;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// reqwest-backed client for the interview and user endpoints
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::invalid_input(format!("invalid API base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::invalid_input(format!(
                "API base URL cannot carry paths: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::invalid_input(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_base_url, config.timeout)
    }

    /// Base URL joined with percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ClientError::invalid_input(format!("API base URL cannot carry paths: {}", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::transport(format!("request timed out: {e}"))
            } else {
                ClientError::transport(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.dispatch(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::decode(format!("unexpected response body: {e}")))
    }
}

fn classify_error(status: StatusCode, body: &str) -> ClientError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| match b.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    let message = match detail {
        Some(detail) => detail,
        None if body.trim().is_empty() => status.to_string(),
        None => body.to_string(),
    };
    ClientError::service(status.as_u16(), message)
}

#[async_trait]
impl SessionClient for HttpApiClient {
    async fn start_session(&self, subject_id: &str) -> Result<SessionId, ClientError> {
        require_subject(subject_id)?;
        let url = self.endpoint(&["interview", "start", subject_id])?;
        let body: StartSessionBody = self.fetch_json(self.client.post(url)).await?;
        Ok(body.session_id)
    }

    async fn send_message(
        &self,
        subject_id: &str,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Reply, ClientError> {
        require_subject(subject_id)?;
        let url = self.endpoint(&["interview", "chat", subject_id])?;
        let request = ChatRequestBody {
            message: text,
            session_id: session_id.map(SessionId::as_str),
        };
        let body: ChatResponseBody = self.fetch_json(self.client.post(url).json(&request)).await?;
        Ok(body.into_reply())
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        let url = self.endpoint(&["interview", "session", session_id.as_str(), "history"])?;
        let body: HistoryBody = self.fetch_json(self.client.get(url)).await?;
        body.history.into_iter().map(Message::try_from).collect()
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        let url = self.endpoint(&["interview", "session", session_id.as_str()])?;
        self.dispatch(self.client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for HttpApiClient {
    async fn get_profile(&self, subject_id: &str) -> Result<UserRecord, ClientError> {
        require_subject(subject_id)?;
        let url = self.endpoint(&["users", subject_id])?;
        self.fetch_json(self.client.get(url)).await
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, ClientError> {
        let url = self.endpoint(&["users", ""])?;
        let body: UserListBody = self.fetch_json(self.client.get(url)).await?;
        Ok(body.users)
    }

    async fn create_profile(&self, profile: &Profile) -> Result<UserRecord, ClientError> {
        let url = self.endpoint(&["users", ""])?;
        let body = ProfileBody {
            profile_data: profile,
        };
        self.fetch_json(self.client.post(url).json(&body)).await
    }

    async fn update_profile(
        &self,
        subject_id: &str,
        profile: &Profile,
    ) -> Result<UserRecord, ClientError> {
        require_subject(subject_id)?;
        let url = self.endpoint(&["users", subject_id])?;
        let body = ProfileBody {
            profile_data: profile,
        };
        self.fetch_json(self.client.put(url).json(&body)).await
    }
}
