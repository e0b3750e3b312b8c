//! # Core Configuration Module
//!
//! Provides configuration management for the event mirror.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `MirrorConfig` holding everything needed to open the local store and talk
//! to the upstream API. It enforces fail-fast validation so a misconfigured
//! mirror never starts.
//!
//! ## Required Settings
//!
//! - Database path - SQLite file backing the mirror
//! - Account credential - account key plus secret key for upstream calls
//!
//! ## Optional Settings (with defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - API base URL - `https://api.stripe.com`
//! - Page cap - 1000 upstream pages per reconciliation
//! - Request timeout - 30 seconds
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::MirrorConfig;
//!
//! let config = MirrorConfig::builder()
//!     .database_path("/var/lib/mirror/events.db")
//!     .credential("acct_1", "sk_live_...")
//!     .max_sync_pages(200)
//!     .build()?;
//! ```
//!
//! ### From the environment
//!
//! ```ignore
//! let config = MirrorConfigBuilder::from_env()?.build()?;
//! ```
//!
//! | Variable | Setting |
//! |---|---|
//! | `EVENT_MIRROR_DATABASE_PATH` | database path |
//! | `EVENT_MIRROR_ACCOUNT_KEY` | account key |
//! | `EVENT_MIRROR_SECRET_KEY` | secret key |
//! | `EVENT_MIRROR_API_BASE` | API base URL |
//! | `EVENT_MIRROR_MAX_SYNC_PAGES` | page cap |

use crate::error::{Error, Result};
use bridge_traits::{AccountCredential, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Upstream API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Default cap on upstream pages fetched per reconciliation
pub const DEFAULT_MAX_SYNC_PAGES: usize = 1000;

/// Default per-request timeout for upstream calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_DATABASE_PATH: &str = "EVENT_MIRROR_DATABASE_PATH";
pub const ENV_ACCOUNT_KEY: &str = "EVENT_MIRROR_ACCOUNT_KEY";
pub const ENV_SECRET_KEY: &str = "EVENT_MIRROR_SECRET_KEY";
pub const ENV_API_BASE: &str = "EVENT_MIRROR_API_BASE";
pub const ENV_MAX_SYNC_PAGES: &str = "EVENT_MIRROR_MAX_SYNC_PAGES";

/// Event mirror configuration.
///
/// Use [`MirrorConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct MirrorConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Credential all upstream calls are made with
    pub credential: AccountCredential,

    /// Upstream API base URL, without trailing slash
    pub api_base_url: String,

    /// HTTP client for upstream requests
    pub http_client: Arc<dyn HttpClient>,

    /// Maximum upstream pages fetched by one reconciliation
    pub max_sync_pages: usize,

    /// Per-request timeout for upstream calls (seconds)
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("database_path", &self.database_path)
            .field("credential", &self.credential)
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("max_sync_pages", &self.max_sync_pages)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl MirrorConfig {
    /// Creates a new builder for constructing a `MirrorConfig`.
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - API base URL is an http(s) URL
    /// - Page cap is greater than zero
    /// - Request timeout is within (0, 300] seconds
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        if self.max_sync_pages == 0 {
            return Err(Error::Config(
                "Max sync pages must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "Request timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.request_timeout_secs > 300 {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for upstream requests. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Otherwise inject an implementation with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout_secs: u64) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;
    use std::time::Duration;

    let client = ReqwestHttpClient::with_timeout(Duration::from_secs(timeout_secs)).map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: format!("Failed to create default ReqwestHttpClient: {}", e),
        }
    })?;

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout_secs: u64) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`MirrorConfig`] instances.
///
/// Call [`build()`](MirrorConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct MirrorConfigBuilder {
    database_path: Option<PathBuf>,
    account_key: Option<String>,
    secret_key: Option<String>,
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    max_sync_pages: Option<usize>,
    request_timeout_secs: Option<u64>,
}

impl MirrorConfigBuilder {
    /// Seed a builder from `EVENT_MIRROR_*` environment variables.
    ///
    /// Unset variables leave the corresponding setting untouched, so the
    /// result can still be refined with the builder methods.
    ///
    /// # Errors
    ///
    /// Returns an error if `EVENT_MIRROR_MAX_SYNC_PAGES` is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Seed a builder from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            builder = builder.database_path(path);
        }

        builder.account_key = lookup(ENV_ACCOUNT_KEY);
        builder.secret_key = lookup(ENV_SECRET_KEY);

        if let Some(base) = lookup(ENV_API_BASE) {
            builder = builder.api_base_url(base);
        }

        if let Some(raw) = lookup(ENV_MAX_SYNC_PAGES) {
            let pages = raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_SYNC_PAGES, raw
                ))
            })?;
            builder = builder.max_sync_pages(pages);
        }

        Ok(builder)
    }

    /// Sets the database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the account key and secret key used for upstream calls.
    pub fn credential(mut self, account_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.account_key = Some(account_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Overrides the upstream API base URL.
    ///
    /// Default: `https://api.stripe.com`
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the cap on upstream pages fetched per reconciliation.
    ///
    /// Default: 1000
    pub fn max_sync_pages(mut self, pages: usize) -> Self {
        self.max_sync_pages = Some(pages);
        self
    }

    /// Sets the per-request timeout for upstream calls.
    ///
    /// Default: 30 seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Builds the final `MirrorConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(MirrorConfig)` on success, or an error if:
    /// - The database path or credential is missing
    /// - No HTTP client is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<MirrorConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(format!(
                "Database path is required. Use .database_path() or set {}.",
                ENV_DATABASE_PATH
            ))
        })?;

        let account_key = self.account_key.ok_or_else(|| {
            Error::Config(format!(
                "Account key is required. Use .credential() or set {}.",
                ENV_ACCOUNT_KEY
            ))
        })?;

        let secret_key = self.secret_key.ok_or_else(|| {
            Error::Config(format!(
                "Secret key is required. Use .credential() or set {}.",
                ENV_SECRET_KEY
            ))
        })?;

        let credential = AccountCredential::new(account_key, secret_key)
            .map_err(|e| Error::Config(format!("Invalid credential: {}", e)))?;

        let request_timeout_secs = self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout_secs)?,
        };

        let config = MirrorConfig {
            database_path,
            credential,
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client,
            max_sync_pages: self.max_sync_pages.unwrap_or(DEFAULT_MAX_SYNC_PAGES),
            request_timeout_secs,
        };

        config.validate()?;

        Ok(config)
    }
}
