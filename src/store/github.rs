//! store::github
//!
//! GitHub contents API implementation of [`DocumentStore`].
//!
//! # Design
//!
//! - `GET /repos/{owner}/{repo}/contents/{path}` returns `{content, sha}` with
//!   base64 content
//! - `PUT` to the same path with `{message, content, sha?, branch?}` writes;
//!   GitHub rejects a stale `sha` with 409 and a missing `sha` for an existing
//!   file with 422
//!
//! Failures are classified into `NotFound`, `Conflict` and `RemoteFailure`
//! from the status code and error message, so callers can tell a concurrency
//! conflict from an authentication or server failure.
//!
//! # Authentication
//!
//! Every request, reads included, asks the [`TokenProvider`] for a fresh
//! `Authorization` header. Failed requests are not retried.
//!
//! # Example
//!
//! ```ignore
//! use cork_registry::store::github::GitHubDocumentStore;
//!
//! let store = GitHubDocumentStore::new(provider, "ucd-library", "cork-build-registry")
//!     .with_branch("main");
//! let doc = store.get(&name).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::codec;
use super::message::change_description;
use super::{path_under, DocumentStore, StoreError, StoredDocument, WriteOutcome, WriteRequest};
use crate::auth::installations::{API_VERSION, USER_AGENT_VALUE};
use crate::auth::TokenProvider;
use crate::core::config::{ConfigError, RegistryConfig, DEFAULT_API_BASE, DEFAULT_PATH_PREFIX};
use crate::core::types::{ProjectName, Sha};

/// GitHub-backed document store.
pub struct GitHubDocumentStore {
    /// HTTP client for making requests
    client: Client,
    /// Credential source, consulted on every request
    provider: Arc<dyn TokenProvider>,
    /// Registry repository owner (user or organization)
    owner: String,
    /// Registry repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
    /// Branch to read from and write to; repository default when `None`
    branch: Option<String>,
    /// Directory holding project documents
    path_prefix: String,
}

impl std::fmt::Debug for GitHubDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubDocumentStore")
            .field("provider", &self.provider.kind())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("branch", &self.branch)
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

impl GitHubDocumentStore {
    /// Create a store for `owner/repo` on github.com.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            provider,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            branch: None,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
        }
    }

    /// Build a store from loaded configuration.
    ///
    /// The configured request timeout applies to both document requests and
    /// token exchanges.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        let client = config.http_client()?;
        let provider = config.token_provider(client.clone())?;
        let mut store = Self::new(provider, config.owner(), config.repo())
            .with_client(client)
            .with_api_base(config.api_base())
            .with_path_prefix(config.path_prefix());
        if let Some(branch) = config.branch() {
            store = store.with_branch(branch);
        }
        Ok(store)
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Use a custom API base URL, e.g. `https://github.example.com/api/v3`.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Read from and write to a specific branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Store documents under a different directory.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Get the registry repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the registry repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build the contents URL for a document path.
    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            StoreError::Configuration(format!("api base '{}': {}", self.api_base, e))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::Configuration(format!("api base '{}' cannot be a base", self.api_base))
            })?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/'));
        }
        Ok(url)
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, StoreError> {
        let credential = self.provider.authorization_header().await?;
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&credential).map_err(|_| {
            StoreError::Configuration("credential is not a valid header value".into())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Map a non-success response to a [`StoreError`].
    async fn error_from_response(response: Response, path: &str) -> StoreError {
        let status = response.status();
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        classify_failure(status, message, path)
    }
}

/// Classify a failed contents-API response.
///
/// - 404: the document does not exist
/// - 409 / 412: the supplied `sha` does not match the current file
/// - 422 mentioning `sha`: a create was attempted over an existing file
/// - anything else: a remote failure (auth, rate limit, server error)
pub fn classify_failure(status: StatusCode, message: String, path: &str) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StoreError::Conflict {
            path: path.to_string(),
            message,
        },
        StatusCode::UNPROCESSABLE_ENTITY if message.to_ascii_lowercase().contains("sha") => {
            StoreError::Conflict {
                path: path.to_string(),
                message,
            }
        }
        _ => StoreError::RemoteFailure {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl DocumentStore for GitHubDocumentStore {
    fn name(&self) -> &'static str {
        "github"
    }

    fn document_path(&self, name: &ProjectName) -> String {
        path_under(&self.path_prefix, name)
    }

    async fn get(&self, name: &ProjectName) -> Result<StoredDocument, StoreError> {
        let path = self.document_path(name);
        let mut url = self.contents_url(&path)?;
        if let Some(ref branch) = self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let response = self
            .client
            .get(url)
            .headers(self.headers().await?)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(%path, status = status.as_u16(), "GET document");
        if !status.is_success() {
            return Err(Self::error_from_response(response, &path).await);
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidContent(format!("{}: {}", path, e)))?;

        if let Some(encoding) = body.encoding.as_deref() {
            if encoding != "base64" {
                return Err(StoreError::InvalidContent(format!(
                    "{}: unsupported encoding '{}'",
                    path, encoding
                )));
            }
        }

        Ok(StoredDocument {
            content: codec::decode(&body.content)?,
            sha: Sha::new(body.sha).map_err(|e| StoreError::InvalidContent(e.to_string()))?,
            path,
        })
    }

    async fn put(&self, request: WriteRequest) -> Result<WriteOutcome, StoreError> {
        let path = self.document_path(&request.name);
        let url = self.contents_url(&path)?;
        let text = request.content.into_text()?;

        let body = PutContentsBody {
            message: change_description(&request.actor, &request.action, &path, &request.version),
            content: codec::encode(&text),
            sha: request.sha.as_ref().map(Sha::as_str),
            branch: self.branch.as_deref(),
        };

        let response = self
            .client
            .put(url)
            .headers(self.headers().await?)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(%path, status = status.as_u16(), "PUT document");
        if !status.is_success() {
            let err = Self::error_from_response(response, &path).await;
            if err.is_conflict() {
                tracing::warn!(%path, actor = %request.actor, "write rejected: stale marker");
            }
            return Err(err);
        }

        let written: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidContent(format!("{}: {}", path, e)))?;

        tracing::info!(%path, action = %request.action, actor = %request.actor, "document written");

        Ok(WriteOutcome {
            sha: Sha::new(written.content.sha)
                .map_err(|e| StoreError::InvalidContent(e.to_string()))?,
            path,
        })
    }
}

// --------------------------------------------------------------------------
// Wire types
// --------------------------------------------------------------------------

/// Response from `GET .../contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
    encoding: Option<String>,
}

/// Body for `PUT .../contents/{path}`.
#[derive(Debug, Serialize)]
struct PutContentsBody<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Response from `PUT .../contents/{path}`.
#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: WrittenFile,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

/// GitHub API error format.
#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    fn store() -> GitHubDocumentStore {
        GitHubDocumentStore::new(
            Arc::new(StaticTokenProvider::new("ghp_test")),
            "ucd-library",
            "cork-build-registry",
        )
    }

    mod urls {
        use super::*;

        #[test]
        fn contents_url_format() {
            let url = store().contents_url("repositories/app.json").unwrap();
            assert_eq!(
                url.as_str(),
                concat!(
                    "https://api.github.com/repos/ucd-library/cork-build-registry",
                    "/contents/repositories/app.json"
                )
            );
        }

        #[test]
        fn contents_url_with_enterprise_base() {
            let url = store()
                .with_api_base("https://ghe.example.com/api/v3")
                .contents_url("repositories/app.json")
                .unwrap();
            assert_eq!(
                url.as_str(),
                concat!(
                    "https://ghe.example.com/api/v3/repos/ucd-library/cork-build-registry",
                    "/contents/repositories/app.json"
                )
            );
        }

        #[test]
        fn contents_url_rejects_bad_base() {
            let result = store().with_api_base("not a url").contents_url("a.json");
            assert!(matches!(result, Err(StoreError::Configuration(_))));
        }

        #[test]
        fn document_path_uses_prefix() {
            let name = ProjectName::new("app").unwrap();
            assert_eq!(store().document_path(&name), "repositories/app.json");
            assert_eq!(
                store().with_path_prefix("projects").document_path(&name),
                "projects/app.json"
            );
        }
    }

    mod classification {
        use super::*;

        #[test]
        fn not_found() {
            let err = classify_failure(StatusCode::NOT_FOUND, "Not Found".into(), "p.json");
            assert!(matches!(err, StoreError::NotFound(ref p) if p == "p.json"));
        }

        #[test]
        fn stale_sha_is_conflict() {
            let err = classify_failure(
                StatusCode::CONFLICT,
                "p.json does not match abc".into(),
                "p.json",
            );
            assert!(err.is_conflict());
        }

        #[test]
        fn missing_sha_is_conflict() {
            let err = classify_failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request.\n\n\"sha\" wasn't supplied.".into(),
                "p.json",
            );
            assert!(err.is_conflict());
        }

        #[test]
        fn other_validation_is_remote_failure() {
            let err = classify_failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request. content is not valid Base64".into(),
                "p.json",
            );
            assert!(matches!(err, StoreError::RemoteFailure { status: 422, .. }));
        }

        #[test]
        fn auth_failures_are_remote_failures() {
            for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
                let err = classify_failure(status, "Bad credentials".into(), "p.json");
                assert!(!err.is_conflict());
                assert!(matches!(err, StoreError::RemoteFailure { .. }));
            }
        }
    }

    #[test]
    fn put_body_omits_absent_sha_and_branch() {
        let body = PutContentsBody {
            message: "m".into(),
            content: "e30=".into(),
            sha: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert!(json.get("branch").is_none());
    }

    #[test]
    fn debug_does_not_expose_token() {
        let debug = format!("{:?}", store());
        assert!(debug.contains("ucd-library"));
        assert!(!debug.contains("ghp_test"));
    }

    #[tokio::test]
    async fn headers_carry_credential() {
        let headers = store().headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "token ghp_test");
        assert_eq!(headers.get("X-GitHub-Api-Version").unwrap(), API_VERSION);
    }
}
