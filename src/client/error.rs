//! Client error types

use thiserror::Error;

/// Failure of a remote call, with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
    /// HTTP status for service errors
    pub status: Option<u16>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, message)
    }

    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ClientErrorKind::Service, message)
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Decode, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::InvalidInput, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Where a call broke down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// No response: connection refused, DNS, timeout
    Transport,
    /// Response received with a non-success status
    Service,
    /// Success status but the body was not what we expected
    Decode,
    /// Rejected before anything was sent
    InvalidInput,
}

impl ClientErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Service => "service",
            Self::Decode => "decode",
            Self::InvalidInput => "invalid_input",
        }
    }
}
