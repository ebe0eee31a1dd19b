//! registry::errors
//!
//! Error types for registry operations.

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::types::TypeError;
use crate::store::StoreError;

/// Errors from registry operations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// An input was missing or malformed. No request was made, or the
    /// document was read but nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// The project or version is already registered.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The project document or version entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The project forbids changing registered versions.
    #[error("versions of '{0}' are immutable")]
    ImmutableVersions(String),

    /// Another writer changed the document first.
    #[error("write conflict on {path}: {message}")]
    Conflict {
        /// Document path
        path: String,
        /// Message from the store
        message: String,
    },

    /// No credential could be obtained.
    #[error("credential error: {0}")]
    Credential(AuthError),

    /// The store failed for any other reason.
    #[error("store error: {0}")]
    Remote(StoreError),
}

impl RegistryError {
    /// Whether the operation lost an optimistic-concurrency race.
    ///
    /// The document is unchanged by this call; retrying the whole operation
    /// reads the winner's version.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Conflict { .. })
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => RegistryError::NotFound(path),
            StoreError::Conflict { path, message } => RegistryError::Conflict { path, message },
            StoreError::Credential(auth) => RegistryError::Credential(auth),
            other => RegistryError::Remote(other),
        }
    }
}

impl From<TypeError> for RegistryError {
    fn from(err: TypeError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}
