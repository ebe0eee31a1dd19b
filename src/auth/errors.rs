//! auth::errors
//!
//! Credential error types for GitHub App installation tokens.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens, signed assertions or private key
//! material. Variants carry status codes and server messages only.
//!
//! # Example
//!
//! ```
//! use cork_registry::auth::AuthError;
//!
//! let err = AuthError::ExchangeFailed { status: 401, message: "Bad credentials".into() };
//! assert!(err.to_string().contains("401"));
//! assert!(!err.to_string().contains("ghs_")); // Never contains tokens
//! ```

use thiserror::Error;

/// Errors from obtaining credentials for the registry API.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The configured private key could not be loaded.
    #[error("invalid app private key: {0}")]
    InvalidKey(String),

    /// The app assertion could not be signed.
    #[error("failed to sign app assertion: {0}")]
    Signing(String),

    /// The token exchange endpoint rejected the request.
    #[error("installation token exchange failed: {status} - {message}")]
    ExchangeFailed {
        /// HTTP status code
        status: u16,
        /// Error message from GitHub
        message: String,
    },

    /// The exchange endpoint answered with a body we cannot use.
    #[error("invalid token exchange response: {0}")]
    InvalidResponse(String),

    /// Network error during the exchange.
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Check if this error indicates a transient failure that might succeed on retry.
    ///
    /// Nothing in this crate retries automatically; this is for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Network(_) => true,
            AuthError::ExchangeFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if the error is caused by local configuration (key, app id).
    pub fn is_configuration(&self) -> bool {
        matches!(self, AuthError::InvalidKey(_) | AuthError::Signing(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Signing(err.to_string())
    }
}
