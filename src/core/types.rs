//! core::types
//!
//! Strong types for registry domain concepts.
//!
//! # Types
//!
//! - [`RepositoryUrl`] - Validated repository origin URL
//! - [`ProjectName`] - Project short name, derived from a repository URL
//! - [`VersionLabel`] - Build version label (key of `builds`)
//! - [`Actor`] - Username of the authenticated caller
//! - [`Sha`] - Opaque version marker returned by the document store
//!
//! # Validation
//!
//! These types enforce validity at construction time. Values arriving from
//! the route layer are checked here once, so the registry never sees an empty
//! project name or a malformed URL.
//!
//! # Examples
//!
//! ```
//! use cork_registry::core::types::{ProjectName, RepositoryUrl};
//!
//! let url = RepositoryUrl::new("https://github.com/ucd-library/cork-kube.git").unwrap();
//! let name = ProjectName::from_repository(&url).unwrap();
//! assert_eq!(name.as_str(), "cork-kube");
//!
//! assert!(RepositoryUrl::new("not-a-url").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("invalid project name: {0}")]
    InvalidProjectName(String),

    #[error("invalid version label: {0}")]
    InvalidVersion(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid marker: {0}")]
    InvalidSha(String),
}

/// A repository URL that parses as an absolute URL.
///
/// The original string is kept verbatim; it is what gets written into the
/// project document and what the short name is derived from.
///
/// # Example
///
/// ```
/// use cork_registry::core::types::RepositoryUrl;
///
/// let url = RepositoryUrl::new("https://github.com/owner/repo.git").unwrap();
/// assert_eq!(url.as_str(), "https://github.com/owner/repo.git");
///
/// assert!(RepositoryUrl::new("").is_err());
/// assert!(RepositoryUrl::new("owner/repo").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryUrl(String);

impl RepositoryUrl {
    /// Create a new validated repository URL.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Missing` for an empty string and
    /// `TypeError::InvalidUrl` when the string is not an absolute URL.
    pub fn new(url: impl Into<String>) -> Result<Self, TypeError> {
        let url = url.into();
        if url.is_empty() {
            return Err(TypeError::Missing("repository URL"));
        }
        url::Url::parse(&url).map_err(|e| TypeError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self(url))
    }

    /// Get the URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryUrl {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepositoryUrl> for String {
    fn from(url: RepositoryUrl) -> Self {
        url.0
    }
}

impl AsRef<str> for RepositoryUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A project short name, used as the document key.
///
/// Names map directly onto a file path in the registry repository, so they
/// cannot be empty, cannot be `.` or `..`, and cannot contain path
/// separators, whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Create a new validated project name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Missing` for an empty name and
    /// `TypeError::InvalidProjectName` for names that cannot be a file name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Derive the short name from a repository URL.
    ///
    /// The short name is the last path segment with any `.git` suffix
    /// removed: `https://github.com/org/app.git` becomes `app`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidProjectName` if the URL has no usable
    /// final segment (e.g. `https://github.com/`).
    pub fn from_repository(url: &RepositoryUrl) -> Result<Self, TypeError> {
        let last = url.as_str().rsplit('/').next().unwrap_or_default();
        let short = last.strip_suffix(".git").unwrap_or(last);
        if short.is_empty() {
            return Err(TypeError::InvalidProjectName(format!(
                "cannot derive a project name from '{}'",
                url
            )));
        }
        Self::new(short)
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::Missing("project name"));
        }
        if name == "." || name == ".." {
            return Err(TypeError::InvalidProjectName(format!(
                "'{name}' is reserved"
            )));
        }
        if name.contains(['/', '\\']) {
            return Err(TypeError::InvalidProjectName(format!(
                "'{name}' cannot contain path separators"
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidProjectName(format!(
                "'{name}' cannot contain whitespace or control characters"
            )));
        }
        Ok(())
    }

    /// Get the project name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A build version label, e.g. `v1.2.0` or `sandbox`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionLabel(String);

impl VersionLabel {
    /// Create a new validated version label.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Missing` if empty and `TypeError::InvalidVersion`
    /// if the label contains control characters.
    pub fn new(label: impl Into<String>) -> Result<Self, TypeError> {
        let label = label.into();
        if label.is_empty() {
            return Err(TypeError::Missing("version"));
        }
        if label.chars().any(char::is_control) {
            return Err(TypeError::InvalidVersion(
                "version cannot contain control characters".into(),
            ));
        }
        Ok(Self(label))
    }

    /// Get the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VersionLabel {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VersionLabel> for String {
    fn from(label: VersionLabel) -> Self {
        label.0
    }
}

impl std::fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Username of the authenticated caller.
///
/// Only used for the audit trail in change descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor(String);

impl Actor {
    /// Create a new actor.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Missing` if the username is empty or blank.
    pub fn new(user: impl Into<String>) -> Result<Self, TypeError> {
        let user = user.into();
        if user.trim().is_empty() {
            return Err(TypeError::Missing("user"));
        }
        Ok(Self(user))
    }

    /// Get the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque version marker (the blob sha) for optimistic concurrency.
///
/// Never interpreted, only threaded from a read to the following write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    /// Wrap a marker returned by the store.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidSha` if the marker is empty.
    pub fn new(sha: impl Into<String>) -> Result<Self, TypeError> {
        let sha = sha.into();
        if sha.trim().is_empty() {
            return Err(TypeError::InvalidSha("marker cannot be empty".into()));
        }
        Ok(Self(sha))
    }

    /// Get the marker as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sha {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Sha> for String {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

impl std::fmt::Display for Sha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
