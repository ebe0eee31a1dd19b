//! registry
//!
//! Project registry operations over a [`DocumentStore`].
//!
//! # Lifecycle
//!
//! A project is `Absent` until [`Registry::create_project_file`] writes its
//! document, and `Exists` from then on. There is no delete.
//!
//! # Consistency
//!
//! Every mutation is one read-modify-write: read the document and its
//! marker, validate, change it in memory, write it back conditional on the
//! marker. Either the write lands and the document is fully updated, or
//! nothing changes. A concurrent writer that got there first makes the
//! write fail with [`RegistryError::Conflict`]; the caller decides whether
//! to retry. Operations never retry on their own.
//!
//! # Example
//!
//! ```
//! use cork_registry::registry::Registry;
//! use cork_registry::store::mock::MockStore;
//! use std::collections::BTreeMap;
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::new(MockStore::new());
//! registry
//!     .create_project_file("https://github.com/ucd-library/cork-kube.git", None, "alice")
//!     .await
//!     .unwrap();
//!
//! let deps = BTreeMap::from([("cork-build".to_string(), "v1.0.0".to_string())]);
//! registry.add_version("cork-kube", "v1.0.0", deps, "alice").await.unwrap();
//! # });
//! ```

mod errors;

pub use errors::RegistryError;

use tracing::info;

use crate::core::document::{DependencyMap, ProjectDocument};
use crate::core::types::{Actor, ProjectName, RepositoryUrl, Sha, VersionLabel};
use crate::store::{DocumentContent, DocumentStore, StoreError, WriteRequest};

/// Action label for project creation.
pub const ACTION_CREATE: &str = "creating repository";
/// Action label for dependency registration.
pub const ACTION_ADD_DEPENDENCY: &str = "adding dependency";
/// Action label for new versions.
pub const ACTION_ADD_VERSION: &str = "adding version";
/// Action label for version updates.
pub const ACTION_UPDATE_VERSION: &str = "updating version";

/// A successful registry mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryUpdate {
    /// Project whose document was written.
    pub name: ProjectName,
    /// Path of the document in the registry repository.
    pub path: String,
    /// The document's new version marker.
    pub sha: Sha,
    /// The document as written.
    pub document: ProjectDocument,
}

/// Registry of project build manifests.
///
/// Holds no state besides the store; one registry may serve any number of
/// concurrent operations.
#[derive(Debug, Clone)]
pub struct Registry<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> Registry<S> {
    /// Create a registry over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a project's document.
    ///
    /// # Errors
    ///
    /// - `Validation` if `project` is not a valid name
    /// - `NotFound` if the project is not registered
    pub async fn get_project(&self, project: &str) -> Result<ProjectDocument, RegistryError> {
        let name = project_name(project)?;
        let (document, _) = self.read(&name).await?;
        Ok(document)
    }

    /// Register a new project.
    ///
    /// The project name is the last path segment of `repository` without a
    /// `.git` suffix. `dependencies` defaults to an empty mapping.
    ///
    /// # Errors
    ///
    /// - `Validation` if `repository` is missing or not a URL, or `user` is blank
    /// - `AlreadyExists` if a document already exists for the derived name
    /// - `Conflict` if another writer created it between the read and the write
    pub async fn create_project_file(
        &self,
        repository: &str,
        dependencies: Option<DependencyMap>,
        user: &str,
    ) -> Result<RegistryUpdate, RegistryError> {
        let repository = RepositoryUrl::new(repository)?;
        let actor = Actor::new(user)?;
        let name = ProjectName::from_repository(&repository)?;

        match self.store.get(&name).await {
            Ok(existing) => return Err(RegistryError::AlreadyExists(existing.path)),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let document = ProjectDocument::new(&repository, dependencies.unwrap_or_default());
        let version = name.to_string();
        self.write(name, document, None, actor, ACTION_CREATE, version)
            .await
    }

    /// Register a dependency of a project.
    ///
    /// Sets `dependencies[short_name] = url` and also sets the project's
    /// `repository` to `url`.
    ///
    /// # Errors
    ///
    /// - `Validation` naming the first missing argument, or for a malformed `url`
    /// - `NotFound` if the project is not registered
    /// - `Conflict` if the document changed since it was read
    pub async fn add_dependency(
        &self,
        project: &str,
        short_name: &str,
        url: &str,
        user: &str,
    ) -> Result<RegistryUpdate, RegistryError> {
        require("project name", project)?;
        require("dependency short name", short_name)?;
        require("dependency URL", url)?;
        let actor = Actor::new(user)?;
        let name = project_name(project)?;

        let (mut document, sha) = self.read(&name).await?;
        let url = RepositoryUrl::new(url)?;

        document.set_dependency(short_name, &url);
        let version = url.to_string();
        self.write(name, document, Some(sha), actor, ACTION_ADD_DEPENDENCY, version)
            .await
    }

    /// Record the dependency snapshot of a new version.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank project, version or user
    /// - `NotFound` if the project is not registered
    /// - `AlreadyExists` if `version` already has a build entry
    /// - `Conflict` if the document changed since it was read
    pub async fn add_version(
        &self,
        project: &str,
        version: &str,
        dependencies: DependencyMap,
        user: &str,
    ) -> Result<RegistryUpdate, RegistryError> {
        let name = project_name(project)?;
        let version = VersionLabel::new(version)?;
        let actor = Actor::new(user)?;

        let (mut document, sha) = self.read(&name).await?;
        document.ensure_version_tables();

        if document.has_version(&version) {
            return Err(RegistryError::AlreadyExists(format!(
                "version {} of {}",
                version, name
            )));
        }

        document.set_build(&version, dependencies);
        let label = version.to_string();
        self.write(name, document, Some(sha), actor, ACTION_ADD_VERSION, label)
            .await
    }

    /// Replace the dependency snapshot of an existing version.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank project, version or user
    /// - `NotFound` if the project is not registered or `version` has no
    ///   build entry
    /// - `ImmutableVersions` if the project has `immutableVersions` set,
    ///   whether or not `version` exists
    /// - `Conflict` if the document changed since it was read
    pub async fn update_version(
        &self,
        project: &str,
        version: &str,
        dependencies: DependencyMap,
        user: &str,
    ) -> Result<RegistryUpdate, RegistryError> {
        let name = project_name(project)?;
        let version = VersionLabel::new(version)?;
        let actor = Actor::new(user)?;

        let (mut document, sha) = self.read(&name).await?;
        document.ensure_version_tables();

        if document.immutable_versions() {
            return Err(RegistryError::ImmutableVersions(name.to_string()));
        }
        if !document.has_version(&version) {
            return Err(RegistryError::NotFound(format!(
                "version {} of {}",
                version, name
            )));
        }

        document.set_build(&version, dependencies);
        let label = version.to_string();
        self.write(name, document, Some(sha), actor, ACTION_UPDATE_VERSION, label)
            .await
    }

    async fn read(&self, name: &ProjectName) -> Result<(ProjectDocument, Sha), RegistryError> {
        let stored = self.store.get(name).await?;
        let document = stored.parse::<ProjectDocument>()?;
        Ok((document, stored.sha))
    }

    async fn write(
        &self,
        name: ProjectName,
        document: ProjectDocument,
        sha: Option<Sha>,
        actor: Actor,
        action: &str,
        version: String,
    ) -> Result<RegistryUpdate, RegistryError> {
        let text = document
            .to_json()
            .map_err(|e| StoreError::InvalidContent(e.to_string()))?;

        let outcome = self
            .store
            .put(WriteRequest {
                name: name.clone(),
                content: DocumentContent::Text(text),
                sha,
                actor: actor.clone(),
                action: action.to_string(),
                version,
            })
            .await?;

        info!(
            store = self.store.name(),
            project = %name,
            action,
            actor = %actor,
            path = %outcome.path,
            "registry updated"
        );

        Ok(RegistryUpdate {
            name,
            path: outcome.path,
            sha: outcome.sha,
            document,
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        return Err(RegistryError::Validation(format!("missing {}", field)));
    }
    Ok(())
}

fn project_name(project: &str) -> Result<ProjectName, RegistryError> {
    require("project name", project)?;
    Ok(ProjectName::new(project)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{FailOn, MockOperation, MockStore};
    use serde_json::Value;
    use std::collections::BTreeMap;

    const KUBE: &str = "https://github.com/ucd-library/cork-kube.git";

    fn deps(pairs: &[(&str, &str)]) -> DependencyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn stored_json(store: &MockStore, name: &str) -> Value {
        serde_json::from_str(&store.document(name).unwrap()).unwrap()
    }

    fn last_message(store: &MockStore) -> String {
        match store.operations().into_iter().last() {
            Some(MockOperation::Put { message, .. }) => message,
            other => panic!("expected a put, got {other:?}"),
        }
    }

    mod create_project_file {
        use super::*;

        #[tokio::test]
        async fn writes_new_document() {
            let registry = Registry::new(MockStore::new());
            let update = registry
                .create_project_file(KUBE, Some(deps(&[("cork-build", KUBE)])), "alice")
                .await
                .unwrap();

            assert_eq!(update.name.as_str(), "cork-kube");
            assert_eq!(update.path, "repositories/cork-kube.json");

            let json = stored_json(registry.store(), "cork-kube");
            assert_eq!(json["repository"], KUBE);
            assert_eq!(json["dependencies"]["cork-build"], KUBE);
            assert!(json.get("builds").is_none());
        }

        #[tokio::test]
        async fn stored_text_is_pretty_json() {
            let registry = Registry::new(MockStore::new());
            registry
                .create_project_file("https://github.com/org/app", None, "alice")
                .await
                .unwrap();
            assert_eq!(
                registry.store().document("app").unwrap(),
                "{\n  \"repository\": \"https://github.com/org/app\",\n  \"dependencies\": {}\n}"
            );
        }

        #[tokio::test]
        async fn creates_without_marker_and_describes_change() {
            let registry = Registry::new(MockStore::new());
            registry.create_project_file(KUBE, None, "alice").await.unwrap();

            let ops = registry.store().operations();
            assert!(matches!(&ops[1], MockOperation::Put { sha: None, .. }));
            assert_eq!(
                last_message(registry.store()),
                "[webapp] creating repository repositories/cork-kube.json cork-kube for alice"
            );
        }

        #[tokio::test]
        async fn existing_project_is_rejected_without_write() {
            let store = MockStore::new().with_document("cork-kube", r#"{"repository":"x"}"#);
            let registry = Registry::new(store);

            let err = registry
                .create_project_file(KUBE, None, "alice")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::AlreadyExists(_)));
            assert_eq!(registry.store().put_count(), 0);
        }

        #[tokio::test]
        async fn malformed_url_is_validation_error() {
            let registry = Registry::new(MockStore::new());
            let err = registry
                .create_project_file("not a url", None, "alice")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::Validation(_)));
            assert!(registry.store().operations().is_empty());
        }

        #[tokio::test]
        async fn missing_user_is_validation_error() {
            let registry = Registry::new(MockStore::new());
            let err = registry.create_project_file(KUBE, None, " ").await.unwrap_err();
            assert!(matches!(err, RegistryError::Validation(m) if m.contains("user")));
        }

        #[tokio::test]
        async fn read_failure_other_than_not_found_propagates() {
            let store = MockStore::new().fail_on(FailOn::Get(StoreError::RemoteFailure {
                status: 401,
                message: "Bad credentials".into(),
            }));
            let registry = Registry::new(store);

            let err = registry
                .create_project_file(KUBE, None, "alice")
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                RegistryError::Remote(StoreError::RemoteFailure { status: 401, .. })
            ));
            assert_eq!(registry.store().put_count(), 0);
        }
    }

    mod add_dependency {
        use super::*;

        const DEP: &str = "https://github.com/ucd-library/cork-build.git";

        fn registry() -> Registry<MockStore> {
            Registry::new(MockStore::new().with_document(
                "cork-kube",
                &format!(r#"{{"repository":"{KUBE}","dependencies":{{}}}}"#),
            ))
        }

        #[tokio::test]
        async fn inserts_dependency_and_overwrites_repository() {
            let registry = registry();
            registry
                .add_dependency("cork-kube", "cork-build", DEP, "bob")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "cork-kube");
            assert_eq!(json["dependencies"]["cork-build"], DEP);
            assert_eq!(json["repository"], DEP);
        }

        #[tokio::test]
        async fn writes_project_document_with_marker() {
            let registry = registry();
            let before = registry.store().sha_of("cork-kube").unwrap();
            registry
                .add_dependency("cork-kube", "cork-build", DEP, "bob")
                .await
                .unwrap();

            let put = registry
                .store()
                .operations()
                .into_iter()
                .find(|op| matches!(op, MockOperation::Put { .. }))
                .unwrap();
            assert_eq!(
                put,
                MockOperation::Put {
                    path: "repositories/cork-kube.json".into(),
                    sha: Some(before.to_string()),
                    message: format!(
                        "[webapp] adding dependency repositories/cork-kube.json {DEP} for bob"
                    ),
                }
            );
            assert!(registry.store().document("cork-build").is_none());
        }

        #[tokio::test]
        async fn missing_fields_are_named() {
            let registry = registry();
            let cases = [
                ("", "cork-build", DEP, "bob", "project name"),
                ("cork-kube", "", DEP, "bob", "short name"),
                ("cork-kube", "cork-build", "", "bob", "URL"),
                ("cork-kube", "cork-build", DEP, "", "user"),
            ];
            for (project, short, url, user, field) in cases {
                let err = registry
                    .add_dependency(project, short, url, user)
                    .await
                    .unwrap_err();
                assert!(
                    matches!(&err, RegistryError::Validation(m) if m.contains(field)),
                    "{field}: {err}"
                );
            }
            assert!(registry.store().operations().is_empty());
        }

        #[tokio::test]
        async fn malformed_url_after_read() {
            let registry = registry();
            let err = registry
                .add_dependency("cork-kube", "cork-build", "nope", "bob")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::Validation(_)));
            assert_eq!(registry.store().put_count(), 0);
        }

        #[tokio::test]
        async fn null_dependencies_are_replaced() {
            let store = MockStore::new()
                .with_document("cork-kube", r#"{"repository":"r","dependencies":null}"#);
            let registry = Registry::new(store);
            registry
                .add_dependency("cork-kube", "cork-build", DEP, "bob")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "cork-kube");
            assert_eq!(json["dependencies"], serde_json::json!({ "cork-build": DEP }));
        }

        #[tokio::test]
        async fn unknown_project() {
            let registry = Registry::new(MockStore::new());
            let err = registry
                .add_dependency("ghost", "cork-build", DEP, "bob")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::NotFound(_)));
        }
    }

    mod add_version {
        use super::*;

        #[tokio::test]
        async fn initializes_tables_and_inserts_build() {
            let store =
                MockStore::new().with_document("app", r#"{"repository":"https://x.org/app"}"#);
            let registry = Registry::new(store);

            let update = registry
                .add_version("app", "v1.0.0", deps(&[("lib", "v2")]), "carol")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "app");
            assert_eq!(json["builds"]["v1.0.0"]["lib"], "v2");
            assert_eq!(json["options"], serde_json::json!({}));
            assert_eq!(
                update.document.build(&VersionLabel::new("v1.0.0").unwrap()),
                Some(&deps(&[("lib", "v2")]))
            );
            assert_eq!(
                last_message(registry.store()),
                "[webapp] adding version repositories/app.json v1.0.0 for carol"
            );
        }

        #[tokio::test]
        async fn existing_version_is_rejected() {
            let store = MockStore::new().with_document(
                "app",
                r#"{"repository":"r","builds":{"v1":{"lib":"v1"}}}"#,
            );
            let registry = Registry::new(store);

            let err = registry
                .add_version("app", "v1", deps(&[("lib", "v9")]), "carol")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::AlreadyExists(_)));
            assert_eq!(registry.store().put_count(), 0);
            assert_eq!(stored_json(registry.store(), "app")["builds"]["v1"]["lib"], "v1");
        }

        #[tokio::test]
        async fn other_versions_are_kept() {
            let store = MockStore::new().with_document(
                "app",
                r#"{"repository":"r","builds":{"v1":{"lib":"v1"}}}"#,
            );
            let registry = Registry::new(store);
            registry
                .add_version("app", "v2", BTreeMap::new(), "carol")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "app");
            assert_eq!(json["builds"]["v1"]["lib"], "v1");
            assert_eq!(json["builds"]["v2"], serde_json::json!({}));
        }

        #[tokio::test]
        async fn blank_inputs_are_rejected() {
            let registry = Registry::new(MockStore::new());
            for (project, version, user) in [("", "v1", "u"), ("app", "", "u"), ("app", "v1", "")] {
                let err = registry
                    .add_version(project, version, BTreeMap::new(), user)
                    .await
                    .unwrap_err();
                assert!(matches!(err, RegistryError::Validation(_)));
            }
            assert!(registry.store().operations().is_empty());
        }

        #[tokio::test]
        async fn stale_marker_surfaces_as_conflict() {
            let store = MockStore::new()
                .with_document("app", r#"{"repository":"r"}"#)
                .fail_on(FailOn::Put(StoreError::Conflict {
                    path: "repositories/app.json".into(),
                    message: "is at 1234 but expected abcd".into(),
                }));
            let registry = Registry::new(store);

            let err = registry
                .add_version("app", "v1", BTreeMap::new(), "carol")
                .await
                .unwrap_err();
            assert!(err.is_conflict());
        }

        #[tokio::test]
        async fn unknown_fields_survive() {
            let store = MockStore::new().with_document(
                "app",
                r#"{
                    "repository": "r",
                    "homepage": "https://x.org",
                    "options": {"immutableVersions": false, "channel": "beta"}
                }"#,
            );
            let registry = Registry::new(store);
            registry
                .add_version("app", "v1", BTreeMap::new(), "carol")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "app");
            assert_eq!(json["homepage"], "https://x.org");
            assert_eq!(json["options"]["channel"], "beta");
            assert_eq!(json["options"]["immutableVersions"], false);
        }
    }

    mod update_version {
        use super::*;

        #[tokio::test]
        async fn overwrites_existing_build() {
            let store = MockStore::new().with_document(
                "app",
                r#"{"repository":"r","builds":{"v1":{"lib":"v1"}}}"#,
            );
            let registry = Registry::new(store);

            registry
                .update_version("app", "v1", deps(&[("lib", "v1.0.1")]), "dave")
                .await
                .unwrap();

            let json = stored_json(registry.store(), "app");
            assert_eq!(json["builds"]["v1"], serde_json::json!({"lib": "v1.0.1"}));
            assert_eq!(
                last_message(registry.store()),
                "[webapp] updating version repositories/app.json v1 for dave"
            );
        }

        #[tokio::test]
        async fn missing_version_is_not_found() {
            let store = MockStore::new().with_document("app", r#"{"repository":"r"}"#);
            let registry = Registry::new(store);

            let err = registry
                .update_version("app", "v9", BTreeMap::new(), "dave")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::NotFound(m) if m.contains("v9")));
            assert_eq!(registry.store().put_count(), 0);
        }

        #[tokio::test]
        async fn immutable_versions_block_updates() {
            let store = MockStore::new().with_document(
                "app",
                r#"{"repository":"r","options":{"immutableVersions":true},"builds":{"v1":{}}}"#,
            );
            let registry = Registry::new(store);

            let err = registry
                .update_version("app", "v1", deps(&[("lib", "v2")]), "dave")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::ImmutableVersions(p) if p == "app"));
            assert_eq!(registry.store().put_count(), 0);
        }

        #[tokio::test]
        async fn immutability_checked_before_existence() {
            let store = MockStore::new().with_document(
                "app",
                r#"{"repository":"r","options":{"immutableVersions":true}}"#,
            );
            let registry = Registry::new(store);

            let err = registry
                .update_version("app", "v404", BTreeMap::new(), "dave")
                .await
                .unwrap_err();
            assert!(matches!(err, RegistryError::ImmutableVersions(_)));
        }
    }

    #[tokio::test]
    async fn get_project_parses_document() {
        let store = MockStore::new().with_document(
            "app",
            r#"{"repository":"https://x.org/app","dependencies":{"lib":"https://x.org/lib"}}"#,
        );
        let registry = Registry::new(store);
        let doc = registry.get_project("app").await.unwrap();
        assert_eq!(doc.repository, "https://x.org/app");
        assert_eq!(doc.dependencies["lib"], "https://x.org/lib");
    }

    #[tokio::test]
    async fn writes_go_through_the_wrapped_store() {
        let registry = Registry::new(MockStore::new());
        assert_eq!(registry.store().name(), "mock");

        registry.create_project_file(KUBE, None, "alice").await.unwrap();
        assert_eq!(registry.store().put_count(), 1);
    }

    #[tokio::test]
    async fn corrupt_document_is_remote_error() {
        let store = MockStore::new().with_document("app", "{not json");
        let registry = Registry::new(store);
        let err = registry.get_project("app").await.unwrap_err();
        assert!(matches!(err, RegistryError::Remote(StoreError::InvalidContent(_))));
    }
}
