//! Credential error types.

use thiserror::Error;

/// Credential errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token expired
    #[error("token expired")]
    TokenExpired,

    /// Any other JWT failure (bad signature, malformed token, ...)
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Client-safe message that does not leak token internals.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "session expired",
            AuthError::Jwt(_) => "authentication failed",
        }
    }
}

/// Result type for credential operations
pub type AuthResult<T> = Result<T, AuthError>;
