//! Error types for talking to the teaching assistant backend.

use thiserror::Error;

/// User-facing text shown when the backend cannot be reached at all.
pub const CONNECTION_HINT: &str =
    "Unable to connect to chat server. Please ensure the backend is running.";

/// Banner text when the backend took longer than the request timeout.
pub const TIMEOUT_HINT: &str =
    "The server is taking too long to respond. Your message may still be processed; reopen the conversation to check.";

/// Failures surfaced by the transport layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The backend could not be reached (refused, DNS, timeout).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The backend accepted the request but did not answer in time. The
    /// request may still be processed, so it is never replayed.
    #[error("Request to {endpoint} timed out: {message}")]
    Timeout {
        endpoint: &'static str,
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("Server responded with status: {status} ({endpoint})")]
    Server {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("Invalid response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    /// Any other request failure.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl ClientError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn server(endpoint: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            endpoint,
            status,
            body: body.into(),
        }
    }

    pub fn timeout(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::Timeout {
            endpoint,
            message: message.into(),
        }
    }

    pub fn decode(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            endpoint,
            message: message.into(),
        }
    }

    /// Whether the failure happened before the backend produced any response.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection { .. } => CONNECTION_HINT.to_string(),
            Self::Timeout { .. } => TIMEOUT_HINT.to_string(),
            Self::Server { status, .. } => format!("Server responded with status: {status}"),
            Self::Decode { message, .. } => format!("Unexpected response from server: {message}"),
            Self::Http(message) => message.clone(),
        }
    }

    /// Classify a reqwest failure for the given endpoint.
    pub(crate) fn from_reqwest(endpoint: &'static str, err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::connection(err.to_string())
        } else if err.is_timeout() {
            Self::timeout(endpoint, err.to_string())
        } else if err.is_decode() {
            Self::decode(endpoint, err.to_string())
        } else if let Some(status) = err.status() {
            Self::server(endpoint, status.as_u16(), err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
