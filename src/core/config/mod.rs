//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables
//!
//! # Environment
//!
//! | Variable | Overrides |
//! |---|---|
//! | `GITHUB_API_BASE_URL` | `github.api_base` |
//! | `GITHUB_REGISTRY_ORG` | `github.owner` |
//! | `GITHUB_REGISTRY_REPO` | `github.repo` |
//! | `GITHUB_REGISTRY_BRANCH` | `github.branch` |
//! | `GITHUB_ACCESS_TOKEN` | `github.access_token` |
//! | `GITHUB_APP_ID` | `github.app.app_id` |
//! | `GITHUB_APP_INSTALLATION_ID` | `github.app.installation_id` |
//! | `GITHUB_APP_PRIVATE_KEY` | `github.app.private_key` |
//! | `GITHUB_APP_PRIVATE_KEY_PATH` | `github.app.private_key_path` |
//! | `REGISTRY_HTTP_TIMEOUT_SECS` | `github.timeout_secs` |
//!
//! # Example
//!
//! ```no_run
//! use cork_registry::core::config::RegistryConfig;
//! use cork_registry::store::github::GitHubDocumentStore;
//!
//! let config = RegistryConfig::load().unwrap();
//! let store = GitHubDocumentStore::from_config(&config).unwrap();
//! println!("registry: {}/{}", config.owner(), config.repo());
//! ```

pub mod schema;

pub use schema::{AppSection, ConfigFile, GitHubSection};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::auth::installations::USER_AGENT_VALUE;
use crate::auth::{
    AppAssertionSigner, AuthError, GitHubTokenExchange, InstallationTokenProvider,
    StaticTokenProvider, SystemClock, TokenProvider,
};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default owner of the registry repository.
pub const DEFAULT_OWNER: &str = "ucd-library";

/// Default registry repository.
pub const DEFAULT_REPO: &str = "cork-build-registry";

/// Default directory holding project documents.
pub const DEFAULT_PATH_PREFIX: &str = "repositories";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CORK_REGISTRY_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no credentials configured: set GitHub App credentials or an access token")]
    NoCredentials,

    #[error("incomplete GitHub App credentials: {0}")]
    IncompleteApp(String),

    #[error("failed to read private key '{path}': {source}")]
    PrivateKey {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("credential setup failed: {0}")]
    Credential(#[from] AuthError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Resolved registry configuration.
///
/// Accessors apply defaults; the raw file values stay in `file`.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Parsed file merged with environment overrides
    pub file: ConfigFile,
    /// Path the file was loaded from, if any
    loaded_from: Option<PathBuf>,
}

impl RegistryConfig {
    /// Load configuration from the default locations and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, an
    /// override is malformed, or the result fails validation. A missing
    /// config file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration with a custom variable lookup.
    ///
    /// `lookup` stands in for the process environment, both for locating
    /// the file and for overrides.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match Self::discover(&lookup) {
            Some(path) => Self::read(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load one config file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an in-memory file.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let config = Self {
            file,
            loaded_from: None,
        };
        config.validate()?;
        Ok(config)
    }

    fn discover<F>(lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Some(xdg_home) = lookup("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("cork-registry/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".cork-registry/config.toml"))
            .filter(|path| path.exists())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Apply environment overrides on top of the file values.
    ///
    /// Empty variables are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let github = &mut self.file.github;

        if let Some(v) = get("GITHUB_API_BASE_URL") {
            github.api_base = Some(v);
        }
        if let Some(v) = get("GITHUB_REGISTRY_ORG") {
            github.owner = Some(v);
        }
        if let Some(v) = get("GITHUB_REGISTRY_REPO") {
            github.repo = Some(v);
        }
        if let Some(v) = get("GITHUB_REGISTRY_BRANCH") {
            github.branch = Some(v);
        }
        if let Some(v) = get("GITHUB_ACCESS_TOKEN") {
            github.access_token = Some(v);
        }
        if let Some(v) = get("REGISTRY_HTTP_TIMEOUT_SECS") {
            github.timeout_secs = Some(parse_number("REGISTRY_HTTP_TIMEOUT_SECS", &v)?);
        }

        let app_id = get("GITHUB_APP_ID");
        let installation_id = get("GITHUB_APP_INSTALLATION_ID")
            .map(|v| parse_number("GITHUB_APP_INSTALLATION_ID", &v))
            .transpose()?;
        let private_key = get("GITHUB_APP_PRIVATE_KEY");
        let private_key_path = get("GITHUB_APP_PRIVATE_KEY_PATH").map(PathBuf::from);

        if app_id.is_some()
            || installation_id.is_some()
            || private_key.is_some()
            || private_key_path.is_some()
        {
            let app = github.app.get_or_insert_with(AppSection::default);
            if app_id.is_some() {
                app.app_id = app_id;
            }
            if installation_id.is_some() {
                app.installation_id = installation_id;
            }
            if private_key.is_some() {
                app.private_key = private_key;
            }
            if private_key_path.is_some() {
                app.private_key_path = private_key_path;
            }
        }

        Ok(())
    }

    /// Validate the resolved configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidValue` for malformed values
    /// - `IncompleteApp` when some but not all app fields are set and no
    ///   access token is available
    /// - `NoCredentials` when neither an app nor an access token is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        let github = &self.file.github;
        github.validate()?;

        let app = github.app.as_ref();
        if app.is_some_and(AppSection::is_complete) {
            return Ok(());
        }
        if github.access_token.is_some() {
            return Ok(());
        }
        match app {
            Some(app) if app.is_partial() => {
                Err(ConfigError::IncompleteApp(missing_app_fields(app)))
            }
            _ => Err(ConfigError::NoCredentials),
        }
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// API base URL.
    ///
    /// Defaults to `https://api.github.com`.
    pub fn api_base(&self) -> &str {
        self.file
            .github
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Owner of the registry repository.
    pub fn owner(&self) -> &str {
        self.file.github.owner.as_deref().unwrap_or(DEFAULT_OWNER)
    }

    /// Registry repository name.
    pub fn repo(&self) -> &str {
        self.file.github.repo.as_deref().unwrap_or(DEFAULT_REPO)
    }

    /// Branch to read and write.
    ///
    /// Returns `None` to use the repository's default branch.
    pub fn branch(&self) -> Option<&str> {
        self.file.github.branch.as_deref()
    }

    /// Directory holding project documents.
    pub fn path_prefix(&self) -> &str {
        self.file
            .github
            .path_prefix
            .as_deref()
            .unwrap_or(DEFAULT_PATH_PREFIX)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.file.github.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Whether complete GitHub App credentials are configured.
    pub fn uses_app(&self) -> bool {
        self.file
            .github
            .app
            .as_ref()
            .is_some_and(AppSection::is_complete)
    }

    /// Path of the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<Client, ConfigError> {
        Client::builder()
            .timeout(self.timeout())
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// Credential provider for the configured credentials.
    ///
    /// App credentials take precedence over an access token. The private
    /// key is read and parsed here so a bad key fails at startup.
    pub fn token_provider(&self, client: Client) -> Result<Arc<dyn TokenProvider>, ConfigError> {
        let github = &self.file.github;

        if let Some(app) = github.app.as_ref().filter(|app| app.is_complete()) {
            let pem = match (&app.private_key, &app.private_key_path) {
                (Some(inline), _) => inline.clone().into_bytes(),
                (None, Some(path)) => fs::read(path).map_err(|e| ConfigError::PrivateKey {
                    path: path.clone(),
                    source: e,
                })?,
                (None, None) => return Err(ConfigError::IncompleteApp(missing_app_fields(app))),
            };
            let (Some(app_id), Some(installation_id)) = (&app.app_id, app.installation_id) else {
                return Err(ConfigError::IncompleteApp(missing_app_fields(app)));
            };

            let signer = AppAssertionSigner::from_pem(app_id.clone(), &pem)?;
            let clock = Arc::new(SystemClock);
            let exchange = GitHubTokenExchange::new(
                client,
                self.api_base(),
                installation_id,
                signer,
                clock.clone(),
            );
            tracing::debug!(installation_id, "using GitHub App installation credentials");
            return Ok(Arc::new(InstallationTokenProvider::new(
                Arc::new(exchange),
                clock,
            )));
        }

        match &github.access_token {
            Some(token) => {
                tracing::debug!("using personal access token");
                Ok(Arc::new(StaticTokenProvider::new(token.clone())))
            }
            None => Err(ConfigError::NoCredentials),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            ConfigError::InvalidValue(format!("{} must be a number, got '{}'", key, value))
        })
}

fn missing_app_fields(app: &AppSection) -> String {
    let mut missing = Vec::new();
    if app.app_id.is_none() {
        missing.push("app_id");
    }
    if app.installation_id.is_none() {
        missing.push("installation_id");
    }
    if app.private_key.is_none() && app.private_key_path.is_none() {
        missing.push("private_key or private_key_path");
    }
    format!("missing {}", missing.join(", "))
}
