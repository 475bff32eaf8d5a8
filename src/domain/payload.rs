//! Raw manifest payloads and the errors produced while fulfilling them.
//!
//! A payload is the not-yet-parsed manifest: whatever bytes a fulfillment
//! strategy (or a fallback supplier) handed back, together with the content
//! type it declared.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw manifest bytes plus the declared content type
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilledPayload {
    /// Content type declared by the producer of the bytes
    pub content_type: String,

    /// Manifest bytes, not yet parsed
    pub bytes: Vec<u8>,
}

impl FulfilledPayload {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Manifests can be large; keep logs readable.
impl fmt::Debug for FulfilledPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FulfilledPayload")
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// A failed fulfillment attempt
///
/// The message is shown verbatim in the step log, so it should read well to
/// a human looking at a support report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FulfillmentError {
    /// Human-readable failure message
    pub message: String,

    /// Structured diagnostic from the remote server, if one was reached
    pub server_data: Option<ServerData>,
}

impl FulfillmentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_data: None,
        }
    }

    pub fn with_server_data(mut self, server_data: ServerData) -> Self {
        self.server_data = Some(server_data);
        self
    }
}

/// What the server said when a fulfillment request went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerData {
    /// URI that was requested
    pub uri: String,

    /// HTTP status code
    pub code: u16,

    /// Content type of the response body, if declared
    pub content_type: Option<String>,

    /// Response body, lossily decoded as UTF-8
    pub body: String,

    /// RFC 7807 problem document, if the body was one
    pub problem_report: Option<ProblemReport>,
}

/// RFC 7807 `application/problem+json` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReport {
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub status: Option<u16>,

    #[serde(default)]
    pub detail: Option<String>,
}

impl ProblemReport {
    /// Content types under which servers publish problem documents
    pub const CONTENT_TYPES: [&'static str; 2] =
        ["application/problem+json", "application/api-problem+json"];

    /// Try to read a problem document from a response body
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Option<Self> {
        let content_type = content_type?;
        let essence = content_type.split(';').next().unwrap_or("").trim();
        if !Self::CONTENT_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
        {
            return None;
        }

        serde_json::from_slice(body).ok()
    }
}

/// Credentials forwarded untouched to the fulfillment strategy
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Credentials {
    /// HTTP basic authentication
    UsernamePassword { username: String, password: String },

    /// Bearer token authentication
    BearerToken { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::BearerToken { .. } => f
                .debug_struct("BearerToken")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}
