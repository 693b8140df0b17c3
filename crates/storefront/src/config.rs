//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ATTAR_API_URL` - Base URL of the cart/wishlist REST backend
//!
//! ## Optional
//! - `ATTAR_DATA_DIR` - Directory for device storage snapshots (default: .attar)
//! - `ATTAR_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `ATTAR_AUTH_TOKEN` - Bearer token of the signed-in shopper
//! - `ATTAR_USER_ID` - Account identifier of the signed-in shopper
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::identity::Identity;

const DEFAULT_DATA_DIR: &str = ".attar";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// REST backend configuration
    pub api: ApiConfig,
    /// Directory holding device storage snapshots
    pub data_dir: PathBuf,
    /// Shopper credentials, if signed in
    pub credentials: Option<Credentials>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// REST backend configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; always ends in `/` so relative paths join beneath it
    pub base_url: Url,
    /// Runtime request timeout
    pub request_timeout: Duration,
}

/// Credentials of a signed-in shopper.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credentials {
    /// Account identifier
    pub user_id: String,
    /// Bearer token
    pub token: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_source(&get)?;
        let data_dir = PathBuf::from(
            get("ATTAR_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let credentials = Credentials::from_source(&get)?;

        Ok(Self {
            api,
            data_dir,
            credentials,
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Identity described by the configured credentials.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.credentials
            .as_ref()
            .map_or(Identity::Anonymous, |creds| {
                Identity::authenticated(creds.user_id.clone(), creds.token.clone())
            })
    }
}

impl ApiConfig {
    /// Build an API configuration for a base URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("ATTAR_API_URL", base_url)?,
            request_timeout: Duration::from_secs(30),
        })
    }

    fn from_source(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = get("ATTAR_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("ATTAR_API_URL".to_string()))?;
        let base_url = parse_base_url("ATTAR_API_URL", &raw_url)?;

        let timeout_secs = get("ATTAR_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ATTAR_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Credentials {
    fn from_source(get: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        match (get("ATTAR_USER_ID"), get("ATTAR_AUTH_TOKEN")) {
            (Some(user_id), Some(token)) => Ok(Some(Self {
                user_id,
                token: SecretString::from(token),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("ATTAR_AUTH_TOKEN".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("ATTAR_USER_ID".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, requiring http(s) and a trailing slash on the path.
fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
