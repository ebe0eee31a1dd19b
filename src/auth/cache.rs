//! auth::cache
//!
//! In-memory installation credential state.
//!
//! # Design
//!
//! The credential is either absent or valid until a fixed instant:
//!
//! - `Empty` at process start, and after the token passes its usable window
//! - `Valid { token, usable_until }` after an exchange
//!
//! `usable_until` is the declared expiry minus [`EXPIRY_MARGIN_SECS`], so a
//! token is never handed out in its last minute. State is replaced wholesale,
//! never mutated in place, and never written to disk.

use chrono::{DateTime, Duration, Utc};

use super::installations::IssuedToken;

/// Safety margin before declared expiry (60 seconds).
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cached installation credential.
#[derive(Clone, Default)]
pub enum CredentialState {
    /// No usable token.
    #[default]
    Empty,
    /// A token usable until `usable_until`.
    Valid {
        /// The access token.
        token: String,
        /// Instant after which the token must not be used.
        usable_until: DateTime<Utc>,
    },
}

impl CredentialState {
    /// Build the state for a token issued at `now`.
    pub fn issued(issued: IssuedToken, now: DateTime<Utc>) -> Self {
        CredentialState::Valid {
            token: issued.token,
            usable_until: now + issued.expires_in - Duration::seconds(EXPIRY_MARGIN_SECS),
        }
    }

    /// The token, if still usable at `now`.
    pub fn token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        match self {
            CredentialState::Valid {
                token,
                usable_until,
            } if now < *usable_until => Some(token.as_str()),
            _ => None,
        }
    }

    /// Whether a usable token is held at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token_at(now).is_some()
    }

    /// When the current token stops being usable.
    pub fn usable_until(&self) -> Option<DateTime<Utc>> {
        match self {
            CredentialState::Valid { usable_until, .. } => Some(*usable_until),
            CredentialState::Empty => None,
        }
    }
}

// Custom Debug to avoid exposing tokens
impl std::fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialState::Empty => f.write_str("Empty"),
            CredentialState::Valid { usable_until, .. } => f
                .debug_struct("Valid")
                .field("token", &"[REDACTED]")
                .field("usable_until", usable_until)
                .finish(),
        }
    }
}
