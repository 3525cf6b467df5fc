//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Callers map these onto their own transport. `kind()` groups the variants
/// into expected failures (bad input, bad credentials, ...) and internal
/// errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Unknown user or wrong password. Deliberately carries no detail.
    #[error("Unauthorized: unknown user or wrong password")]
    Unauthorized,

    #[error("A session is already active for this user")]
    SessionActive,

    /// Sealed data failed authentication (wrong key or tampered file)
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Authenticated plaintext could not be decoded
    #[error("Format error: {0}")]
    Format(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session manager is closed")]
    Closed,

    #[error("{} errors closing session manager: {}", .0.len(), join_failures(.0))]
    Flush(Vec<FlushFailure>),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A single user that could not be persisted during shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushFailure {
    pub user: String,
    pub reason: String,
}

fn join_failures(failures: &[FlushFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.user, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a duplicate error
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Stable, machine-readable classification of this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Duplicate(_) => "duplicate",
            Error::Unauthorized | Error::Integrity(_) => "unauthorized",
            Error::SessionActive => "session_active",
            Error::NotFound(_) => "not_found",
            Error::Closed => "closed",
            _ => "internal",
        }
    }

    /// Whether this is an expected failure the caller should surface as-is
    pub fn is_expected(&self) -> bool {
        self.kind() != "internal"
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Error classification from [`Error::kind`]
    pub kind: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            kind: Some("internal".to_string()),
            context: None,
        }
    }

    /// Create a failed result from a core error, keeping its classification
    ///
    /// Integrity failures are reported with the generic unauthorized message.
    pub fn from_error(error: &Error) -> Self {
        let message = match error {
            Error::Integrity(_) => Error::Unauthorized.to_string(),
            other => other.to_string(),
        };
        Self {
            success: false,
            data: None,
            error: Some(message),
            kind: Some(error.kind().to_string()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
        assert!(result.kind.is_none());
    }

    #[test]
    fn test_from_result_keeps_kind() {
        let err: Result<i32> = Err(Error::validation("password too short"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.kind.as_deref(), Some("validation"));
        assert!(result.error.unwrap().contains("Validation error"));
    }

    #[test]
    fn test_integrity_is_reported_as_unauthorized() {
        let result: OperationResult<()> =
            OperationResult::from_error(&Error::integrity("aead::Error"));
        assert_eq!(result.kind.as_deref(), Some("unauthorized"));
        let message = result.error.unwrap();
        assert!(!message.contains("aead"));
        assert_eq!(message, Error::Unauthorized.to_string());
    }

    #[test]
    fn test_error_kinds() {
        assert!(Error::Unauthorized.is_expected());
        assert!(Error::duplicate("bob").is_expected());
        assert!(Error::not_found("token").is_expected());
        assert!(!Error::format("bad gzip").is_expected());
        assert!(!Error::Io(std::io::Error::other("disk")).is_expected());
    }

    #[test]
    fn test_flush_error_lists_failures() {
        let err = Error::Flush(vec![
            FlushFailure { user: "alice".into(), reason: "disk full".into() },
            FlushFailure { user: "bob".into(), reason: "read-only".into() },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 errors closing session manager"));
        assert!(msg.contains("alice: disk full"));
        assert!(msg.contains("bob: read-only"));
    }
}
