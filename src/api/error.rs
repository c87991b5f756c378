//! Structured request errors

use thiserror::Error;

/// Why a request did not produce a usable response
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RequestError {
    #[error("{path} returned HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        path: String,
        status: u16,
        detail: Option<String>,
        body: serde_json::Value,
    },

    #[error("Request to {path} failed: {message}")]
    Network { path: String, message: String },

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Request to {path} was cancelled")]
    Cancelled { path: String },
}

impl RequestError {
    /// Builds a status error, pulling `detail` out of the body when present
    pub fn from_status(path: impl Into<String>, status: u16, body: serde_json::Value) -> Self {
        let detail = match &body {
            serde_json::Value::Object(map) => map
                .get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        RequestError::Status {
            path: path.into(),
            status,
            detail,
            body,
        }
    }

    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided detail message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            RequestError::Status { path, .. }
            | RequestError::Network { path, .. }
            | RequestError::Decode { path, .. }
            | RequestError::Cancelled { path } => path,
        }
    }

    /// True for results of requests dropped by `clear()` or a handle's `cancel()`
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled { .. })
    }
}
