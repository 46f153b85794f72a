//! Remote authority error types.

use thiserror::Error;

/// Errors returned by a [`crate::RemoteAuthority`].
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the client timeout
    #[error("Request timed out")]
    Timeout,

    /// Credentials or token rejected (401/403)
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RemoteError {
    /// Classify a reqwest error, folding timeouts into [`RemoteError::Timeout`].
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// Network-class failures: the server may well accept the same request later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Unauthorized { .. } | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type alias for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(RemoteError::from_status(401, String::new()).is_unauthorized());
        assert!(RemoteError::from_status(403, String::new()).is_unauthorized());
        assert!(!RemoteError::from_status(400, String::new()).is_unauthorized());
    }

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Timeout.is_transient());
        assert!(RemoteError::from_status(503, String::new()).is_transient());
        assert!(RemoteError::from_status(429, String::new()).is_transient());
        assert!(!RemoteError::from_status(404, String::new()).is_transient());
        assert!(!RemoteError::from_status(401, String::new()).is_transient());
        assert!(!RemoteError::Decode("bad".into()).is_transient());
    }
}
