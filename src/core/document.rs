//! core::document
//!
//! Project document schema.
//!
//! # Schema
//!
//! One JSON file per project, stored at `repositories/<name>.json`:
//!
//! ```json
//! {
//!   "repository": "https://github.com/ucd-library/cork-kube.git",
//!   "dependencies": { "cork-common": "https://github.com/ucd-library/cork-common" },
//!   "builds": {
//!     "v1.0.0": { "cork-common": "v2.3.1" }
//!   },
//!   "options": { "immutableVersions": true }
//! }
//! ```
//!
//! `builds` and `options` are absent on freshly created projects and are
//! initialized the first time a version is added or updated.
//!
//! Fields this registry does not model are kept in `extra` maps so that a
//! read-modify-write never drops data written by other tools. Shapes that
//! are modeled are strict: a `dependencies` value that is not an object of
//! strings fails to parse instead of being coerced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{RepositoryUrl, VersionLabel};

/// Mapping from dependency short name to a URL or pinned version.
pub type DependencyMap = BTreeMap<String, String>;

/// A project's registry document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Origin URL of the project repository.
    pub repository: String,

    /// Dependencies by short name. An explicit `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: DependencyMap,

    /// Dependency snapshots by version label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builds: Option<BTreeMap<String, DependencyMap>>,

    /// Registry flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RegistryOptions>,

    /// Unmodeled top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-project registry flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryOptions {
    /// When true, existing build snapshots can never be overwritten.
    /// An explicit `false` is kept on write; absent stays absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable_versions: Option<bool>,

    /// Unmodeled flags, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<DependencyMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<DependencyMap>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProjectDocument {
    /// Create the document for a newly registered project.
    pub fn new(repository: &RepositoryUrl, dependencies: DependencyMap) -> Self {
        Self {
            repository: repository.to_string(),
            dependencies,
            builds: None,
            options: None,
            extra: Map::new(),
        }
    }

    /// Parse a document from its JSON text.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the stored form (pretty JSON, two-space indent).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Insert or overwrite a dependency.
    ///
    /// The project's `repository` is also set to the dependency URL. Existing
    /// clients rely on this, so it is kept.
    pub fn set_dependency(&mut self, short_name: &str, url: &RepositoryUrl) {
        self.dependencies
            .insert(short_name.to_string(), url.to_string());
        self.repository = url.to_string();
    }

    /// Initialize `options` and `builds` if absent.
    pub fn ensure_version_tables(&mut self) {
        self.options.get_or_insert_with(RegistryOptions::default);
        self.builds.get_or_insert_with(BTreeMap::new);
    }

    /// Whether versions of this project are immutable once added.
    pub fn immutable_versions(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.immutable_versions)
            .unwrap_or(false)
    }

    /// Check whether a build entry exists for `version`.
    pub fn has_version(&self, version: &VersionLabel) -> bool {
        self.builds
            .as_ref()
            .is_some_and(|builds| builds.contains_key(version.as_str()))
    }

    /// Get the dependency snapshot for `version`.
    pub fn build(&self, version: &VersionLabel) -> Option<&DependencyMap> {
        self.builds.as_ref()?.get(version.as_str())
    }

    /// Insert or overwrite the dependency snapshot for `version`.
    pub fn set_build(&mut self, version: &VersionLabel, dependencies: DependencyMap) {
        self.builds
            .get_or_insert_with(BTreeMap::new)
            .insert(version.to_string(), dependencies);
    }
}
