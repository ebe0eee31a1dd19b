//! store
//!
//! Document store over a repository's file-content API.
//!
//! # Architecture
//!
//! The `DocumentStore` trait is the only way the registry touches
//! persistence. Every document read returns its version marker ([`Sha`]);
//! every write carries the marker it was based on, and the backing store
//! rejects the write if the document has moved on. Lost updates are detected
//! remotely, never locally.
//!
//! # Modules
//!
//! - [`github`]: GitHub contents API implementation
//! - [`mock`]: In-memory implementation for deterministic testing
//! - [`codec`]: Transport encoding (base64) of document bytes
//! - [`message`]: Change descriptions for the store's history
//!
//! # Example
//!
//! ```ignore
//! use cork_registry::store::{DocumentStore, WriteRequest, DocumentContent};
//!
//! let doc = store.get(&name).await?;
//! store.put(WriteRequest {
//!     name,
//!     content: DocumentContent::Text(updated),
//!     sha: Some(doc.sha),
//!     actor,
//!     action: "adding version".into(),
//!     version: "v1.0.0".into(),
//! }).await?;
//! ```

pub mod codec;
pub mod github;
pub mod message;
pub mod mock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::auth::AuthError;
use crate::core::types::{Actor, ProjectName, Sha};

/// Errors from document store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write was based on a stale or missing version marker.
    #[error("write conflict on {path}: {message}")]
    Conflict {
        /// Document path
        path: String,
        /// Message from the store
        message: String,
    },

    /// The store rejected the request for any other reason.
    #[error("remote error: {status} - {message}")]
    RemoteFailure {
        /// HTTP status code
        status: u16,
        /// Error message from the store
        message: String,
    },

    /// No credential could be obtained for the request.
    #[error("credential error: {0}")]
    Credential(#[from] AuthError),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The stored content could not be decoded or serialized.
    #[error("invalid document content: {0}")]
    InvalidContent(String),

    /// The store is misconfigured (bad base URL, bad header value).
    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Whether this is an optimistic-concurrency conflict.
    ///
    /// Callers may retry the whole read-modify-write from a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Whether the store answered that the document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Path within the registry repository.
    pub path: String,
    /// Decoded JSON text.
    pub content: String,
    /// Version marker to pass back on the next write.
    pub sha: Sha,
}

impl StoredDocument {
    /// Parse the decoded content as JSON.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_str(&self.content)
            .map_err(|e| StoreError::InvalidContent(format!("{}: {}", self.path, e)))
    }
}

/// Content for a write.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    /// Already-serialized JSON text, written as is.
    Text(String),
    /// A structured value, serialized as pretty JSON before writing.
    Json(serde_json::Value),
}

impl DocumentContent {
    /// The text that will be stored.
    pub fn into_text(self) -> Result<String, StoreError> {
        match self {
            DocumentContent::Text(text) => Ok(text),
            DocumentContent::Json(value) => serde_json::to_string_pretty(&value)
                .map_err(|e| StoreError::InvalidContent(e.to_string())),
        }
    }
}

/// A conditional write.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Document to write.
    pub name: ProjectName,
    /// New content.
    pub content: DocumentContent,
    /// `None` creates a new document; `Some` must match the current marker.
    pub sha: Option<Sha>,
    /// Who asked for the change.
    pub actor: Actor,
    /// Free-text action label, e.g. "adding version".
    pub action: String,
    /// Version label recorded in the change description.
    pub version: String,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path that was written.
    pub path: String,
    /// The document's new version marker.
    pub sha: Sha,
}

/// Store of JSON documents with optimistic concurrency.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by all
/// concurrent registry operations.
///
/// # Error Handling
///
/// - `NotFound`: the document does not exist
/// - `Conflict`: the marker did not match; re-read and retry if desired
/// - `RemoteFailure` / `Network` / `Credential`: the request did not succeed
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store name (e.g., "github"), reported in write logs.
    fn name(&self) -> &'static str;

    /// Path of a project's document within the registry repository.
    fn document_path(&self, name: &ProjectName) -> String;

    /// Read a document with its current marker.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the document does not exist
    async fn get(&self, name: &ProjectName) -> Result<StoredDocument, StoreError>;

    /// Write a document, conditional on `request.sha`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the marker is stale, or missing for an existing document
    async fn put(&self, request: WriteRequest) -> Result<WriteOutcome, StoreError>;
}

/// Path for a document named `name` under `prefix`.
pub(crate) fn path_under(prefix: &str, name: &ProjectName) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}.json", name)
    } else {
        format!("{}/{}.json", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_under_prefix() {
        let name = ProjectName::new("app").unwrap();
        assert_eq!(path_under("repositories", &name), "repositories/app.json");
        assert_eq!(path_under("/repositories/", &name), "repositories/app.json");
        assert_eq!(path_under("", &name), "app.json");
    }

    #[test]
    fn json_content_is_pretty() {
        let content = DocumentContent::Json(serde_json::json!({"repository": "r"}));
        assert_eq!(content.into_text().unwrap(), "{\n  \"repository\": \"r\"\n}");
    }

    #[test]
    fn text_content_is_verbatim() {
        let content = DocumentContent::Text("{\"a\":1}".into());
        assert_eq!(content.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn stored_document_parse_error_names_path() {
        let doc = StoredDocument {
            path: "repositories/app.json".into(),
            content: "{".into(),
            sha: Sha::new("abc").unwrap(),
        };
        let err = doc.parse::<serde_json::Value>().unwrap_err();
        assert!(err.to_string().contains("repositories/app.json"));
    }

    #[test]
    fn error_classification() {
        let conflict = StoreError::Conflict {
            path: "p".into(),
            message: "m".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
        assert!(StoreError::NotFound("p".into()).is_not_found());
        assert!(!StoreError::RemoteFailure {
            status: 401,
            message: "Bad credentials".into()
        }
        .is_conflict());
    }

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::RemoteFailure {
                status: 500,
                message: "boom".into()
            }
            .to_string(),
            "remote error: 500 - boom"
        );
        assert_eq!(
            StoreError::NotFound("repositories/x.json".into()).to_string(),
            "not found: repositories/x.json"
        );
    }
}
