//! Session guard error types.

use remote_authority::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Credentials rejected at sign-in or sign-up
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No authenticated session (guest mode)
    #[error("Not signed in")]
    NotSignedIn,

    /// Refresh credential expired or was rejected; the session has been signed out
    #[error("Session expired")]
    SessionExpired,

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Remote call failed for a reason other than rejected credentials
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Session could not be persisted or restored
    #[error("Storage error: {0}")]
    Storage(#[from] notebook_storage::StorageError),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
