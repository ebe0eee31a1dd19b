//! auth - Credentials for the registry's backing API
//!
//! This module obtains the `Authorization` header value attached to every
//! request against the GitHub contents API.
//!
//! # Architecture
//!
//! The auth system:
//! - Signs a short-lived app assertion with the GitHub App's private key
//! - Exchanges it for an installation access token
//! - Caches the token in process memory until 60 seconds before expiry
//! - Falls back to a personal access token when no app is configured
//! - Never exposes tokens in logs, errors, or debug output
//!
//! # Components
//!
//! - [`TokenProvider`] - Trait for providing authorization headers to the store
//! - [`InstallationTokenProvider`] - Cached installation tokens
//! - [`StaticTokenProvider`] - Personal access token fallback
//! - [`AppAssertionSigner`] - RS256 app assertions
//! - [`GitHubTokenExchange`] - HTTP client for the token exchange
//! - [`Clock`] - Injected time source
//!
//! # Example
//!
//! ```ignore
//! use cork_registry::auth::TokenProvider;
//!
//! let provider = config.token_provider(config.http_client()?)?;
//! let header = provider.authorization_header().await?;
//! ```

pub mod assertion;
pub mod cache;
mod clock;
mod errors;
pub mod installations;
mod provider;

// Re-export public types
pub use assertion::AppAssertionSigner;
pub use cache::{CredentialState, EXPIRY_MARGIN_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::AuthError;
pub use installations::{GitHubTokenExchange, IssuedToken, TokenExchange};
pub use provider::{InstallationTokenProvider, StaticTokenProvider};

/// Trait for providing credentials to the document store.
///
/// Implementors must:
/// - Return a value usable directly as an HTTP `Authorization` header
/// - Refresh transparently when a cached credential is near expiry
/// - Never log or expose token values, including through `Debug`
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// Returns a valid `Authorization` header value, refreshing if necessary.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] from the exchange is returned as is; there is no
    /// automatic retry.
    async fn authorization_header(&self) -> Result<String, AuthError>;

    /// Short label for the credential kind, for logging.
    fn kind(&self) -> &'static str;
}
