//! Client configuration
//!
//! Passed explicitly at construction; nothing here is process-global.

use crate::transcript::ChatSurface;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8001/api";
pub const DEFAULT_SUBJECT_ID: &str = "1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the remote API lives and who we are talking to
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Profile impersonated by the chat counterpart
    pub subject_id: String,
    pub surface: ChatSurface,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            subject_id: DEFAULT_SUBJECT_ID.to_string(),
            surface: ChatSurface::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let surface = match lookup("TWIN_CHAT_SURFACE") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Ignoring TWIN_CHAT_SURFACE");
                defaults.surface
            }),
            None => defaults.surface,
        };

        let timeout = match lookup("TWIN_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map_or_else(
                    || {
                        tracing::warn!(value = %raw, "Ignoring TWIN_TIMEOUT_SECS");
                        defaults.timeout
                    },
                    Duration::from_secs,
                ),
            None => defaults.timeout,
        };

        Self {
            api_base_url: lookup("TWIN_API_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            subject_id: lookup("TWIN_SUBJECT_ID")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.subject_id),
            surface,
            timeout,
        }
    }
}
