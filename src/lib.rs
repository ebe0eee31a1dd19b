//! cork-registry - A GitHub-backed registry of project build manifests
//!
//! Each registered project has one JSON document in a GitHub repository
//! recording its origin URL, its dependencies, and the dependency snapshot
//! of every released version. The repository's commit history is the audit
//! log of who changed what.
//!
//! # Architecture
//!
//! - [`registry`] - The four registry operations (create, add dependency,
//!   add version, update version)
//! - [`store`] - Document store over the GitHub contents API, with
//!   optimistic concurrency on the file's blob SHA
//! - [`auth`] - GitHub App installation tokens, cached until shortly
//!   before expiry, with a personal-access-token fallback
//! - [`core`] - Domain types, document schema, and configuration
//!
//! # Correctness Invariants
//!
//! 1. No lost updates: every write is conditional on the marker it read
//! 2. A cached credential is never used within 60 seconds of its expiry
//! 3. A failed operation leaves the document unchanged
//!
//! # Logging
//!
//! Events are emitted with `tracing`. The library never installs a
//! subscriber and never logs credential values.

pub mod auth;
pub mod core;
pub mod registry;
pub mod store;
