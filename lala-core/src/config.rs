//! Configuration.
//!
//! [`AuthConfig`] describes the hosted identity provider the session manager
//! talks to; [`ClientConfig`] holds the base URLs of the platform APIs that
//! consume the session. Both can be loaded from `LALA_*` environment
//! variables and are normalized on construction.

use crate::errors::{ConfigError, MissingSettings};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the AWS region.
pub const ENV_REGION: &str = "LALA_AWS_REGION";
/// Environment variable holding the hosted UI domain.
pub const ENV_COGNITO_DOMAIN: &str = "LALA_COGNITO_DOMAIN";
/// Environment variable holding the app client ID.
pub const ENV_COGNITO_CLIENT_ID: &str = "LALA_COGNITO_CLIENT_ID";
/// Environment variable holding the OAuth redirect URI.
pub const ENV_REDIRECT_URI: &str = "LALA_REDIRECT_URI";
/// Environment variable holding the platform API base URL.
pub const ENV_API_BASE: &str = "LALA_API_BASE";
/// Environment variable holding the uploads API base URL.
pub const ENV_UPLOADS_API: &str = "LALA_UPLOADS_API";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Redirect URI used when none is configured (local dev server).
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173";

/// Configuration for the hosted identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// AWS region of the user pool.
    pub region: String,
    /// OAuth host of the hosted UI, without scheme or trailing slash.
    pub hosted_domain: String,
    /// App client ID.
    pub client_id: String,
    /// Redirect URI registered with the app client, always ending in `/`.
    pub redirect_uri: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            hosted_domain: String::new(),
            client_id: String::new(),
            redirect_uri: normalize_redirect_uri(DEFAULT_REDIRECT_URI),
        }
    }
}

impl AuthConfig {
    /// Create a config, normalizing the domain and redirect URI.
    pub fn new(
        hosted_domain: impl AsRef<str>,
        client_id: impl Into<String>,
        redirect_uri: impl AsRef<str>,
    ) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            hosted_domain: normalize_domain(hosted_domain.as_ref()),
            client_id: client_id.into().trim().to_string(),
            redirect_uri: normalize_redirect_uri(redirect_uri.as_ref()),
        }
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the hosted UI domain.
    #[must_use]
    pub fn with_hosted_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.hosted_domain = normalize_domain(domain.as_ref());
        self
    }

    /// Set the app client ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into().trim().to_string();
        self
    }

    /// Set the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl AsRef<str>) -> Self {
        self.redirect_uri = normalize_redirect_uri(uri.as_ref());
        self
    }

    /// Load from environment variables.
    ///
    /// Looks for:
    /// - `LALA_AWS_REGION` (default `us-east-1`)
    /// - `LALA_COGNITO_DOMAIN`
    /// - `LALA_COGNITO_CLIENT_ID`
    /// - `LALA_REDIRECT_URI` (default `http://localhost:5173`)
    ///
    /// Missing values are left empty; call [`validate`](Self::validate) to
    /// find out which ones are required.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup(ENV_REGION)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let redirect =
            lookup(ENV_REDIRECT_URI).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        Self {
            region,
            hosted_domain: normalize_domain(&lookup(ENV_COGNITO_DOMAIN).unwrap_or_default()),
            client_id: lookup(ENV_COGNITO_CLIENT_ID)
                .unwrap_or_default()
                .trim()
                .to_string(),
            redirect_uri: normalize_redirect_uri(&redirect),
        }
    }

    /// Check that every required setting is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.hosted_domain.is_empty() {
            missing.push(ENV_COGNITO_DOMAIN);
        }
        if self.client_id.is_empty() {
            missing.push(ENV_COGNITO_CLIENT_ID);
        }
        if self.redirect_uri.is_empty() {
            missing.push(ENV_REDIRECT_URI);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingSettings::new(missing).into())
        }
    }

    /// Derive the hosted UI endpoints.
    pub fn endpoints(&self) -> Result<HostedUiEndpoints, ConfigError> {
        self.validate()?;
        let base = format!("https://{}/", self.hosted_domain);
        let base = Url::parse(&base)
            .map_err(|e| ConfigError::invalid_url(ENV_COGNITO_DOMAIN, &self.hosted_domain, e))?;
        HostedUiEndpoints::from_base(&base)
    }
}

/// Absolute URLs of the hosted UI endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedUiEndpoints {
    /// `/oauth2/authorize`
    pub authorize: Url,
    /// `/oauth2/token`
    pub token: Url,
    /// `/logout`
    pub logout: Url,
}

impl HostedUiEndpoints {
    /// Derive the endpoints from a base URL such as `https://auth.example.com/`.
    pub fn from_base(base: &Url) -> Result<Self, ConfigError> {
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ConfigError::invalid_url(ENV_COGNITO_DOMAIN, base.as_str(), e))
        };
        Ok(Self {
            authorize: join("oauth2/authorize")?,
            token: join("oauth2/token")?,
            logout: join("logout")?,
        })
    }
}

/// Base URLs of the platform APIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Platform REST API (leaderboard, profile).
    pub api_base: Option<Url>,
    /// Uploads API exposing `POST sign`.
    pub uploads_api: Option<Url>,
}

impl ClientConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the platform API base URL.
    pub fn with_api_base(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base = Some(parse_base_url(ENV_API_BASE, url)?);
        Ok(self)
    }

    /// Set the uploads API base URL.
    pub fn with_uploads_api(mut self, url: &str) -> Result<Self, ConfigError> {
        self.uploads_api = Some(parse_base_url(ENV_UPLOADS_API, url)?);
        Ok(self)
    }

    /// Load from `LALA_API_BASE` and `LALA_UPLOADS_API`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| -> Result<Option<Url>, ConfigError> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => parse_base_url(name, &v).map(Some),
                None => Ok(None),
            }
        };
        Ok(Self {
            api_base: read(ENV_API_BASE)?,
            uploads_api: read(ENV_UPLOADS_API)?,
        })
    }
}

/// Strip any `http(s)://` prefix and trailing slashes from a domain.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

/// Make a non-empty redirect URI end with `/`.
pub fn normalize_redirect_uri(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Parse a base URL, forcing a trailing `/` so relative joins append.
fn parse_base_url(setting: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let normalized = normalize_redirect_uri(raw);
    Url::parse(&normalized).map_err(|e| ConfigError::invalid_url(setting, raw, e))
}
