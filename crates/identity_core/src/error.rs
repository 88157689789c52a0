//! crates/identity_core/src/error.rs
//!
//! The error taxonomy every core service reports at its boundary.

use crate::password::PasswordError;
use crate::ports::PortError;
use crate::tokens::TokenError;

/// Errors surfaced by the session manager, account manager and profile aggregator.
///
/// Each variant carries a human-readable message that is safe to show to callers.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Missing or blank input, or an upload that did not resolve.
    #[error("{0}")]
    Validation(String),

    /// Duplicate username or email.
    #[error("{0}")]
    Conflict(String),

    /// No matching user or channel.
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials or a missing, invalid, expired or superseded token.
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected store or signing failure. The message is for logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used by the core services.
pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl From<PortError> for IdentityError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => Self::NotFound(what),
            PortError::Conflict(what) => Self::Conflict(what),
            PortError::Unexpected(what) => Self::Internal(what),
        }
    }
}

impl From<PasswordError> for IdentityError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for IdentityError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(what) => Self::Internal(what),
            TokenError::Expired => Self::Unauthorized("Refresh token is expired".to_string()),
            TokenError::InvalidSignature | TokenError::Malformed => {
                Self::Unauthorized("Invalid refresh token".to_string())
            }
        }
    }
}
