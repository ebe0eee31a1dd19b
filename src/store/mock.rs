//! store::mock
//!
//! In-memory document store for deterministic testing.
//!
//! # Design
//!
//! Behaves like the contents API where it matters to the registry:
//! - content round-trips through the same base64 codec
//! - every write produces a new content-derived marker
//! - a write with a stale marker, or without a marker over an existing
//!   document, fails with `Conflict`
//!
//! Operations are recorded for verification and a failure can be injected
//! per operation.
//!
//! # Example
//!
//! ```
//! use cork_registry::store::mock::MockStore;
//! use cork_registry::store::DocumentStore;
//! use cork_registry::core::types::ProjectName;
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new().with_document("app", r#"{"repository":"https://x.org/app"}"#);
//! let doc = store.get(&ProjectName::new("app").unwrap()).await.unwrap();
//! assert!(doc.content.contains("x.org"));
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::codec;
use super::message::change_description;
use super::{
    path_under, DocumentStore, StoreError, StoredDocument, WriteOutcome, WriteRequest,
};
use crate::core::config::DEFAULT_PATH_PREFIX;
use crate::core::types::{ProjectName, Sha};

/// Mock store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug)]
struct MockStoreInner {
    /// Stored files by path: (base64 content, marker).
    files: HashMap<String, (String, Sha)>,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `get` with the given error.
    Get(StoreError),
    /// Fail `put` with the given error.
    Put(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Get {
        path: String,
    },
    Put {
        path: String,
        sha: Option<String>,
        message: String,
    },
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner {
                files: HashMap::new(),
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Seed a document (builder style).
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid project name.
    pub fn with_document(self, name: &str, json: &str) -> Self {
        let name = ProjectName::new(name).expect("valid project name");
        {
            let mut inner = self.lock();
            inner.files.insert(
                path_under(DEFAULT_PATH_PREFIX, &name),
                (codec::encode(json), marker_for(json)),
            );
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Number of recorded writes.
    pub fn put_count(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::Put { .. }))
            .count()
    }

    /// Decoded content of a document (for test verification).
    pub fn document(&self, name: &str) -> Option<String> {
        let name = ProjectName::new(name).ok()?;
        let inner = self.lock();
        let (encoded, _) = inner.files.get(&path_under(DEFAULT_PATH_PREFIX, &name))?;
        codec::decode(encoded).ok()
    }

    /// Current marker of a document (for test verification).
    pub fn sha_of(&self, name: &str) -> Option<Sha> {
        let name = ProjectName::new(name).ok()?;
        let inner = self.lock();
        inner
            .files
            .get(&path_under(DEFAULT_PATH_PREFIX, &name))
            .map(|(_, sha)| sha.clone())
    }

    /// Count of stored documents.
    pub fn document_count(&self) -> usize {
        self.lock().files.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockStoreInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Option<StoreError> {
        match &self.lock().fail_on {
            Some(FailOn::Get(e)) if expected == "get" => Some(e.clone()),
            Some(FailOn::Put(e)) if expected == "put" => Some(e.clone()),
            _ => None,
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Content-derived marker, in the spirit of a git blob id.
fn marker_for(text: &str) -> Sha {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", text.len()).as_bytes());
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    Sha::new(&digest[..40]).expect("hex digest is never empty")
}

#[async_trait]
impl DocumentStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn document_path(&self, name: &ProjectName) -> String {
        path_under(DEFAULT_PATH_PREFIX, name)
    }

    async fn get(&self, name: &ProjectName) -> Result<StoredDocument, StoreError> {
        let path = self.document_path(name);
        self.record(MockOperation::Get { path: path.clone() });

        if let Some(err) = self.check_fail("get") {
            return Err(err);
        }

        let (encoded, sha) = {
            let inner = self.lock();
            inner
                .files
                .get(&path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(path.clone()))?
        };

        Ok(StoredDocument {
            content: codec::decode(&encoded)?,
            sha,
            path,
        })
    }

    async fn put(&self, request: WriteRequest) -> Result<WriteOutcome, StoreError> {
        let path = self.document_path(&request.name);
        let message = change_description(&request.actor, &request.action, &path, &request.version);
        self.record(MockOperation::Put {
            path: path.clone(),
            sha: request.sha.as_ref().map(|s| s.to_string()),
            message,
        });

        if let Some(err) = self.check_fail("put") {
            return Err(err);
        }

        let text = request.content.into_text()?;

        // Check and swap under one lock so concurrent writers serialize
        let mut inner = self.lock();
        let current = inner.files.get(&path).map(|(_, sha)| sha.clone());
        match (&current, &request.sha) {
            (Some(_), None) => {
                return Err(StoreError::Conflict {
                    path,
                    message: "Invalid request.\n\n\"sha\" wasn't supplied.".into(),
                })
            }
            (Some(current), Some(given)) if current != given => {
                return Err(StoreError::Conflict {
                    message: format!("{} does not match {}", path, given),
                    path,
                })
            }
            (None, Some(given)) => {
                return Err(StoreError::Conflict {
                    message: format!("{} does not exist at {}", path, given),
                    path,
                })
            }
            _ => {}
        }

        let sha = marker_for(&text);
        inner
            .files
            .insert(path.clone(), (codec::encode(&text), sha.clone()));
        Ok(WriteOutcome { path, sha })
    }
}
