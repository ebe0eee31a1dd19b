//! auth::provider
//!
//! [`TokenProvider`] implementations.
//!
//! # Architecture
//!
//! [`InstallationTokenProvider`]:
//! - Holds a process-wide [`CredentialState`] behind an `RwLock`
//! - On a miss, runs one [`TokenExchange`] and replaces the state wholesale
//! - Reads time from an injected [`Clock`]
//!
//! [`StaticTokenProvider`] wraps a personal access token and never refreshes.
//!
//! # Concurrency
//!
//! The lock is never held across the exchange. Two callers racing on a cold
//! cache may both exchange; installation tokens are idempotent to acquire,
//! so the only cost is a duplicate request. The last writer's token wins.
//!
//! # Example
//!
//! ```ignore
//! use cork_registry::auth::{InstallationTokenProvider, SystemClock, TokenProvider};
//! use std::sync::Arc;
//!
//! let provider = InstallationTokenProvider::new(Arc::new(exchange), Arc::new(SystemClock));
//! let header = provider.authorization_header().await?;
//! ```

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::cache::CredentialState;
use super::clock::Clock;
use super::errors::AuthError;
use super::installations::TokenExchange;
use super::TokenProvider;

/// Provides installation tokens, exchanging only when the cache is cold.
pub struct InstallationTokenProvider {
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    state: RwLock<CredentialState>,
}

impl InstallationTokenProvider {
    /// Create a provider with an empty cache.
    pub fn new(exchange: Arc<dyn TokenExchange>, clock: Arc<dyn Clock>) -> Self {
        Self {
            exchange,
            clock,
            state: RwLock::new(CredentialState::Empty),
        }
    }

    /// The cached token, if still usable.
    fn cached_token(&self) -> Option<String> {
        let now = self.clock.now();
        let state = self.state.read().ok()?;
        state.token_at(now).map(str::to_string)
    }

    /// Replace the cached state.
    fn update_cache(&self, state: CredentialState) {
        if let Ok(mut cache) = self.state.write() {
            *cache = state;
        }
    }

    /// Drop the cached token so the next call exchanges again.
    pub fn invalidate(&self) {
        self.update_cache(CredentialState::Empty);
    }

    /// When the cached token stops being usable, if one is held.
    pub fn usable_until(&self) -> Option<DateTime<Utc>> {
        self.state.read().ok()?.usable_until()
    }

    /// Return a usable token, exchanging if needed.
    pub async fn token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let issued = self.exchange.exchange().await?;
        let token = issued.token.clone();
        let state = CredentialState::issued(issued, self.clock.now());
        tracing::debug!(usable_until = ?state.usable_until(), "cached installation token");

        self.update_cache(state);
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for InstallationTokenProvider {
    async fn authorization_header(&self) -> Result<String, AuthError> {
        Ok(format!("Bearer {}", self.token().await?))
    }

    fn kind(&self) -> &'static str {
        "installation"
    }
}

// Custom Debug to avoid exposing tokens
impl std::fmt::Debug for InstallationTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationTokenProvider")
            .field("usable_until", &self.usable_until())
            .finish_non_exhaustive()
    }
}

/// Personal access token fallback.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap a personal access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn authorization_header(&self) -> Result<String, AuthError> {
        Ok(format!("token {}", self.token))
    }

    fn kind(&self) -> &'static str {
        "access-token"
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
