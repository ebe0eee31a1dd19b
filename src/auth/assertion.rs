//! auth::assertion
//!
//! Signed GitHub App assertions (RS256 JWTs).
//!
//! GitHub accepts an app JWT for at most 10 minutes. Claims are:
//! - `iat`: now minus 60 seconds, to tolerate clock skew with GitHub
//! - `exp`: now plus 9 minutes
//! - `iss`: the app identifier
//!
//! The assertion is only ever sent to the installation token endpoint.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use super::errors::AuthError;

/// Seconds subtracted from `iat` for clock-skew tolerance.
pub const ISSUED_AT_SKEW_SECS: i64 = 60;

/// Assertion lifetime in seconds (9 minutes).
pub const ASSERTION_TTL_SECS: i64 = 9 * 60;

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Signs app assertions with the app's private key.
pub struct AppAssertionSigner {
    app_id: String,
    key: EncodingKey,
}

impl AppAssertionSigner {
    /// Create a signer from a PEM-encoded RSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKey`] if the PEM cannot be parsed.
    pub fn from_pem(app_id: impl Into<String>, pem: &[u8]) -> Result<Self, AuthError> {
        let key =
            EncodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self {
            app_id: app_id.into(),
            key,
        })
    }

    /// The app identifier used as `iss`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Produce a signed assertion valid from `now`.
    pub fn sign(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = claims_at(&self.app_id, now);
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }
}

fn claims_at(app_id: &str, now: DateTime<Utc>) -> AppClaims {
    AppClaims {
        iat: (now - Duration::seconds(ISSUED_AT_SKEW_SECS)).timestamp(),
        exp: (now + Duration::seconds(ASSERTION_TTL_SECS)).timestamp(),
        iss: app_id.to_string(),
    }
}

// Key material stays out of Debug output
impl std::fmt::Debug for AppAssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppAssertionSigner")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}
