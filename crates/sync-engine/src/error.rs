//! Engine error taxonomy and the error signals surfaced to the UI.

use notebook_storage::StorageError;
use remote_authority::RemoteError;
use serde::{Deserialize, Serialize};
use session_guard::AuthError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Refresh credential expired; the session was signed out
    #[error("Session expired")]
    AuthExpired,

    /// Credentials rejected at sign-in/sign-up
    #[error("Invalid credentials: {0}")]
    AuthInvalid(String),

    /// A remote call failed or timed out. `transient` failures (connection,
    /// timeout, 5xx, 429) may succeed when retried; the rest were rejected.
    #[error("Network failure: {message}")]
    NetworkFailure { message: String, transient: bool },

    /// Tag/note membership lost its symmetry. Indicates a bug.
    #[error("Relation inconsistency: {0}")]
    RelationInconsistency(String),

    /// The intent referenced something that does not exist or is not allowed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable state could not be written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AuthExpired => ErrorKind::AuthExpired,
            EngineError::AuthInvalid(_) => ErrorKind::AuthInvalid,
            EngineError::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            EngineError::RelationInconsistency(_) => ErrorKind::RelationInconsistency,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether this failure flips the status indicator to offline.
    pub fn is_network(&self) -> bool {
        matches!(self, EngineError::NetworkFailure { .. })
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::NetworkFailure { transient: true, .. })
    }
}

impl From<RemoteError> for EngineError {
    fn from(err: RemoteError) -> Self {
        EngineError::NetworkFailure {
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for EngineError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SessionExpired | AuthError::NotSignedIn => EngineError::AuthExpired,
            AuthError::InvalidCredentials(message) => EngineError::AuthInvalid(message),
            AuthError::Remote(e) => EngineError::from(e),
            AuthError::Storage(e) => EngineError::Storage(e.to_string()),
            AuthError::InvalidStateTransition(message) => EngineError::Validation(message),
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthExpired,
    AuthInvalid,
    NetworkFailure,
    RelationInconsistency,
    Validation,
    Storage,
}

/// An operation-specific failure left for the UI to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSignal {
    /// Name of the intent that failed, e.g. `create_tag`.
    pub operation: String,
    pub kind: ErrorKind,
    pub message: String,
    /// The same intent may succeed if dispatched again later.
    pub retryable: bool,
}

impl ErrorSignal {
    pub fn new(operation: &str, error: &EngineError) -> Self {
        Self {
            operation: operation.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_transient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_map_to_taxonomy() {
        assert_eq!(
            EngineError::from(AuthError::SessionExpired),
            EngineError::AuthExpired
        );
        assert_eq!(
            EngineError::from(AuthError::InvalidCredentials("nope".into())).kind(),
            ErrorKind::AuthInvalid
        );
        assert!(EngineError::from(AuthError::Remote(RemoteError::Timeout)).is_network());
    }

    #[test]
    fn test_every_remote_failure_is_network_class() {
        let rejected = EngineError::from(RemoteError::Status {
            status: 400,
            message: "Bad Request".into(),
        });
        assert!(rejected.is_network());
        assert!(!rejected.is_transient());

        let unavailable = EngineError::from(RemoteError::Status {
            status: 503,
            message: "Service Unavailable".into(),
        });
        assert!(unavailable.is_network());
        assert!(unavailable.is_transient());
        assert!(!EngineError::Validation("x".into()).is_network());
    }

    #[test]
    fn test_signal_carries_operation_kind_and_retryability() {
        let signal = ErrorSignal::new("delete_note", &EngineError::from(RemoteError::Timeout));
        assert_eq!(signal.operation, "delete_note");
        assert_eq!(signal.kind, ErrorKind::NetworkFailure);
        assert!(signal.retryable);

        let signal = ErrorSignal::new("create_tag", &EngineError::Validation("dup".into()));
        assert_eq!(signal.kind, ErrorKind::Validation);
        assert!(signal.message.contains("dup"));
        assert!(!signal.retryable);
    }
}
