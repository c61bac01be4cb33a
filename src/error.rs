//! Failure taxonomy for every user-triggered action.
//!
//! Each remote call is observed exactly once, at the point its result first
//! reaches the client, and reduced to a [`CallFailure`]. [`classify`] then
//! maps that observation onto the four [`ErrorKind`]s the operator sees:
//!
//! | Observation | Kind |
//! |-------------|------|
//! | request could not be built | `LocalValidation` |
//! | no response (refused, DNS, timeout) | `TransportUnreachable` |
//! | response with `error` field or non-2xx status | `BackendRejected` |
//! | anything else | `Unknown` |
//!
//! Transport failures and backend rejections are kept apart because the
//! remedies differ: one means checking the network, the other means fixing
//! the core name or the document shape.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message shown for every transport failure.
pub const UNREACHABLE_MESSAGE: &str =
    "backend unreachable — verify it is running and reachable at the given host/port.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocalValidation,
    TransportUnreachable,
    BackendRejected,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LocalValidation => "local_validation",
            ErrorKind::TransportUnreachable => "transport_unreachable",
            ErrorKind::BackendRejected => "backend_rejected",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized failure surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LocalValidation, message)
    }

    pub fn unreachable() -> Self {
        Self::new(ErrorKind::TransportUnreachable, UNREACHABLE_MESSAGE)
    }
}

/// Which remote operation produced a failure; selects fallback messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    FetchMetadata,
}

impl Operation {
    fn rejected_fallback(&self) -> &'static str {
        match self {
            Operation::Upload => "Server error occurred while uploading the file",
            Operation::FetchMetadata => "Server error occurred while fetching metadata",
        }
    }
}

/// What was observed when a remote call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// The request never reached the network layer.
    Build(String),
    /// No response was received.
    NoResponse(String),
    /// A response arrived but signals failure.
    Rejected { status: u16, body: Option<Value> },
    /// Anything else (undecodable payload, unexpected shape, ...).
    Other(String),
}

impl CallFailure {
    /// Reduce a reqwest error to what was actually observed.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            CallFailure::Build(err.to_string())
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            CallFailure::NoResponse(err.to_string())
        } else if let Some(status) = err.status() {
            CallFailure::Rejected {
                status: status.as_u16(),
                body: None,
            }
        } else {
            CallFailure::Other(err.to_string())
        }
    }
}

/// Map an observed failure to the operator-facing taxonomy.
pub fn classify(failure: &CallFailure, op: Operation) -> ClassifiedError {
    match failure {
        CallFailure::Build(msg) => ClassifiedError::local(format!("Invalid request: {}", msg)),
        CallFailure::NoResponse(_) => ClassifiedError::unreachable(),
        CallFailure::Rejected { body, .. } => {
            let message = body
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| op.rejected_fallback().to_string());
            ClassifiedError::new(ErrorKind::BackendRejected, message)
        }
        CallFailure::Other(msg) => ClassifiedError::new(ErrorKind::Unknown, msg.clone()),
    }
}

/// Decide whether a received response is a rejection.
///
/// An `error` field wins regardless of status code: the backend embeds
/// errors in 200 responses.
pub fn inspect_response(status: u16, body: Option<Value>) -> Result<Value, CallFailure> {
    let has_error = body.as_ref().map(has_error_field).unwrap_or(false);
    let success = (200..300).contains(&status);
    match body {
        Some(body) if success && !has_error => Ok(body),
        None if success => Err(CallFailure::Other(
            "backend returned a response that is not JSON".to_string(),
        )),
        body => Err(CallFailure::Rejected { status, body }),
    }
}

fn has_error_field(body: &Value) -> bool {
    match body.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Extract the backend-supplied error text, if any.
///
/// Accepts `{"error": "text"}` and `{"error": {"message": "text"}}`.
fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string())
            .or_else(|| Some(Value::Object(obj.clone()).to_string())),
        _ => None,
    }
}
