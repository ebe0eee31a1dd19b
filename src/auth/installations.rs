//! auth::installations
//!
//! Exchange of a signed app assertion for an installation access token.
//!
//! # Algorithm
//!
//! 1. Sign an app assertion with the app's private key
//! 2. `POST /app/installations/{id}/access_tokens` with `Authorization: Bearer <assertion>`
//! 3. On 201, read `token` plus its lifetime (`expires_in` seconds, or `expires_at`)
//! 4. Any other status is an [`AuthError::ExchangeFailed`]; nothing is retried
//!
//! # Example
//!
//! ```ignore
//! use cork_registry::auth::installations::{GitHubTokenExchange, TokenExchange};
//!
//! let exchange = GitHubTokenExchange::new(client, "https://api.github.com", 4242, signer, clock);
//! let issued = exchange.exchange().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use super::assertion::AppAssertionSigner;
use super::clock::Clock;
use super::errors::AuthError;

/// User-Agent header value for API requests.
pub(crate) const USER_AGENT_VALUE: &str = "cork-registry";

/// GitHub REST API version header value.
pub(crate) const API_VERSION: &str = "2022-11-28";

/// A freshly issued installation token.
#[derive(Clone)]
pub struct IssuedToken {
    /// The access token.
    pub token: String,
    /// Lifetime declared by the server.
    pub expires_in: Duration,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Obtains installation tokens.
///
/// Split out from the provider so expiry handling can be tested without HTTP.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Perform one exchange.
    async fn exchange(&self) -> Result<IssuedToken, AuthError>;
}

/// Response from `POST /app/installations/{id}/access_tokens`.
#[derive(Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_in: Option<i64>,
    expires_at: Option<DateTime<Utc>>,
}

/// Error body returned by the GitHub API.
#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Exchanges app assertions with the GitHub API.
pub struct GitHubTokenExchange {
    client: Client,
    api_base: String,
    installation_id: u64,
    signer: AppAssertionSigner,
    clock: Arc<dyn Clock>,
}

impl GitHubTokenExchange {
    /// Create an exchange for one installation.
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        installation_id: u64,
        signer: AppAssertionSigner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            installation_id,
            signer,
            clock,
        }
    }

    /// The installation this exchange issues tokens for.
    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    fn token_url(&self) -> String {
        format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base.trim_end_matches('/'),
            self.installation_id
        )
    }
}

impl std::fmt::Debug for GitHubTokenExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubTokenExchange")
            .field("api_base", &self.api_base)
            .field("installation_id", &self.installation_id)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenExchange for GitHubTokenExchange {
    async fn exchange(&self) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        let assertion = self.signer.sign(now)?;

        tracing::debug!(
            installation_id = self.installation_id,
            "requesting installation token"
        );

        let response = self
            .client
            .post(self.token_url())
            .header(AUTHORIZATION, format!("Bearer {}", assertion))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GitHubErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            tracing::warn!(
                installation_id = self.installation_id,
                status = status.as_u16(),
                "installation token exchange rejected"
            );
            return Err(AuthError::ExchangeFailed {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AccessTokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let expires_in = lifetime(&parsed, now)?;

        Ok(IssuedToken {
            token: parsed.token,
            expires_in,
        })
    }
}

/// Token lifetime from the response, preferring `expires_in`.
fn lifetime(response: &AccessTokenResponse, now: DateTime<Utc>) -> Result<Duration, AuthError> {
    match (response.expires_in, response.expires_at) {
        (Some(secs), _) => Ok(Duration::seconds(secs)),
        (None, Some(at)) => Ok(at - now),
        (None, None) => Err(AuthError::InvalidResponse(
            "response has neither expires_in nor expires_at".into(),
        )),
    }
}
