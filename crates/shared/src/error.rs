use thiserror::Error;

use crate::domain::{Operation, Role};

/// Transport-level failure of a single request attempt.
///
/// Carries enough of the response (status, raw body text) for the submission
/// boundary to classify it into a user-facing message. Cloneable so the
/// resolver can re-raise the primary attempt's error after fallbacks fail.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("no response received: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Status { status: u16, body: Option<String> },
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Failure classes the message table is keyed on, derived from status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Forbidden,
    NotFound,
    Conflict,
    BadRequest,
    Timeout,
    Network,
    Unknown,
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Network(_) => FailureKind::Network,
            TransportError::Status { status: 401, .. } => FailureKind::Auth,
            TransportError::Status { status: 403, .. } => FailureKind::Forbidden,
            TransportError::Status { status: 404, .. } => FailureKind::NotFound,
            TransportError::Status { status: 409, .. } => FailureKind::Conflict,
            TransportError::Status { status: 400, .. } => FailureKind::BadRequest,
            TransportError::Status { .. } | TransportError::UnexpectedShape(_) => {
                FailureKind::Unknown
            }
        }
    }

    /// The response body, if it amounts to a plain human-readable string.
    ///
    /// Backends in the wild answer errors with either a bare text body, a
    /// JSON-encoded string, or a structured JSON object. Only the first two
    /// are safe to surface to the user as-is.
    pub fn plain_string_body(&self) -> Option<String> {
        let body = match self {
            TransportError::Status { body: Some(b), .. } if !b.trim().is_empty() => b,
            _ => return None,
        };
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::String(s)) => Some(s),
            Ok(_) => None,
            Err(_) => Some(body.trim().to_string()),
        }
    }
}

/// Maps a transport failure to the single human-readable string the view
/// layer shows, applying the same table for all three roles.
pub fn user_message(role: Role, op: Operation, err: &TransportError) -> String {
    let generic = match op {
        Operation::SignIn => "Login failed",
        Operation::Register => "Registration failed",
    };

    match err.kind() {
        FailureKind::Auth => "Invalid username or password".to_string(),
        FailureKind::Forbidden => "Account is disabled. Please contact administrator.".to_string(),
        FailureKind::NotFound => format!("{} not found", role.display_name()),
        FailureKind::Conflict if op == Operation::Register => format!(
            "{} with same username or email already exists",
            role.display_name()
        ),
        FailureKind::BadRequest => err
            .plain_string_body()
            .unwrap_or_else(|| "Invalid data provided".to_string()),
        FailureKind::Timeout => "Request timeout. Please try again.".to_string(),
        FailureKind::Network => {
            format!("{generic}. Please check your connection and try again.")
        }
        _ => err
            .plain_string_body()
            .unwrap_or_else(|| generic.to_string()),
    }
}
