//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$CORK_REGISTRY_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/cork-registry/config.toml`
//! 3. `~/.cork-registry/config.toml`
//!
//! # Validation
//!
//! Values are checked after parsing and after environment overrides are
//! applied, so a file may leave out anything the environment supplies.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Parsed configuration file.
///
/// # Example
///
/// ```toml
/// [github]
/// owner = "ucd-library"
/// repo = "cork-build-registry"
/// branch = "main"
/// timeout_secs = 30
///
/// [github.app]
/// app_id = "123456"
/// installation_id = 7890123
/// private_key_path = "/run/secrets/registry-app.pem"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Registry repository and credentials
    pub github: GitHubSection,
}

/// The `[github]` table.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    /// API base URL (GitHub Enterprise or a test double)
    pub api_base: Option<String>,

    /// Owner of the registry repository
    pub owner: Option<String>,

    /// Registry repository name
    pub repo: Option<String>,

    /// Branch to read and write; repository default when unset
    pub branch: Option<String>,

    /// Directory holding project documents
    pub path_prefix: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Personal access token, used when no app is configured
    pub access_token: Option<String>,

    /// GitHub App credentials
    pub app: Option<AppSection>,
}

impl GitHubSection {
    /// Validate the values present in the table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(api_base) = &self.api_base {
            url::Url::parse(api_base).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid api_base '{}': {}", api_base, e))
            })?;
        }

        for (field, value) in [("owner", &self.owner), ("repo", &self.repo)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{} cannot be empty", field)));
            }
        }

        if matches!(&self.branch, Some(b) if b.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("branch cannot be empty".into()));
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than zero".into(),
            ));
        }

        if let Some(app) = &self.app {
            app.validate()?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for GitHubSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSection")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("path_prefix", &self.path_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("app", &self.app)
            .finish()
    }
}

/// The `[github.app]` table.
///
/// The private key is given inline (`private_key`) or by file
/// (`private_key_path`); inline wins when both are set.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppSection {
    /// App identifier, the `iss` of signed assertions
    pub app_id: Option<String>,

    /// Installation whose token is requested
    pub installation_id: Option<u64>,

    /// PEM-encoded private key
    pub private_key: Option<String>,

    /// Path to a PEM-encoded private key
    pub private_key_path: Option<PathBuf>,
}

impl AppSection {
    /// Validate the values present in the table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(&self.app_id, Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("app_id cannot be empty".into()));
        }
        if matches!(&self.private_key, Some(key) if key.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("private_key cannot be empty".into()));
        }
        Ok(())
    }

    /// Whether every field needed for the token exchange is present.
    pub fn is_complete(&self) -> bool {
        self.app_id.is_some()
            && self.installation_id.is_some()
            && (self.private_key.is_some() || self.private_key_path.is_some())
    }

    /// Whether any app field is set at all.
    pub fn is_partial(&self) -> bool {
        !self.is_complete()
            && (self.app_id.is_some()
                || self.installation_id.is_some()
                || self.private_key.is_some()
                || self.private_key_path.is_some())
    }
}

impl std::fmt::Debug for AppSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSection")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("private_key_path", &self.private_key_path)
            .finish()
    }
}
