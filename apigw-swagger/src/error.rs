//! Error types for the REST API reconciler.

use thiserror::Error;

/// Error code the definition store uses when an object does not exist.
pub const NOT_FOUND_CODE: &str = "NotFoundException";

/// Codes that describe a temporary condition on the store side.
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "RequestTimeout",
    "RequestTimeoutException",
];

/// Failure reported by the definition store.
///
/// Every remote call either succeeds or yields one of these; classification is
/// done on `code` alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NOT_FOUND_CODE, message)
    }

    /// The remote object is absent.
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND_CODE
    }

    /// The store asked us to back off or was briefly unavailable.
    pub fn is_transient(&self) -> bool {
        TRANSIENT_CODES.contains(&self.code.as_str())
    }
}

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Store failure, surfaced with its original text.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An operation that needs an existing object was called without one.
    #[error("resource has no remote identity")]
    MissingIdentity,
}

impl ReconcileError {
    /// The store error code, if this came from the store.
    pub fn code(&self) -> Option<&str> {
        match self {
            ReconcileError::Remote(e) => Some(&e.code),
            ReconcileError::MissingIdentity => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_matched_on_code_only() {
        assert!(RemoteError::new("NotFoundException", "Invalid API identifier").is_not_found());
        assert!(!RemoteError::new("NotFound", "gone").is_not_found());
        assert!(!RemoteError::new("BadRequestException", "NotFoundException").is_not_found());
    }

    #[test]
    fn throttling_is_transient() {
        assert!(RemoteError::new("Throttling", "slow down").is_transient());
        assert!(RemoteError::new("TooManyRequestsException", "slow down").is_transient());
        assert!(!RemoteError::new("ConflictException", "in use").is_transient());
        assert!(!RemoteError::not_found("gone").is_transient());
    }

    #[test]
    fn remote_message_is_kept_verbatim() {
        let err: ReconcileError =
            RemoteError::new("BadRequestException", "Invalid OpenAPI input.").into();
        assert_eq!(err.to_string(), "BadRequestException: Invalid OpenAPI input.");
        assert_eq!(err.code(), Some("BadRequestException"));
        assert_eq!(ReconcileError::MissingIdentity.code(), None);
    }
}
