//! Authentication errors.

use lala_core::{ConfigError, LalaError, StorageError};
use thiserror::Error;

/// Errors that can escape [`SessionManager::login`](crate::SessionManager::login)
/// and [`SessionManager::logout`](crate::SessionManager::logout).
///
/// Callback handling and token reads never return these; they degrade to
/// "signed out" instead.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required identity provider settings are missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session or token storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The OS random source failed.
    #[error("Random source unavailable: {0}")]
    Random(String),
}

impl AuthError {
    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<AuthError> for LalaError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Config(e) => LalaError::Config(e),
            AuthError::Storage(e) => LalaError::Storage(e),
            AuthError::Random(msg) => LalaError::Internal(msg),
        }
    }
}

/// Errors from the token endpoint exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("Token exchange failed: HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The success body was not a valid token response.
    #[error("Invalid token response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ExchangeError {
    /// HTTP status, if the endpoint answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Errors decoding ID token claims.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    #[error("Malformed token: {0}")]
    Malformed(&'static str),

    /// The payload segment is not base64url.
    #[error("Invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload is not a JSON claims object with the required fields.
    #[error("Invalid claims: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lala_core::MissingSettings;

    #[test]
    fn test_config_error_is_config() {
        let err = AuthError::from(ConfigError::from(MissingSettings::new(vec![
            "LALA_COGNITO_DOMAIN",
        ])));
        assert!(err.is_config());
        assert!(err.to_string().contains("LALA_COGNITO_DOMAIN"));
    }

    #[test]
    fn test_into_lala_error() {
        let err: LalaError = AuthError::Random("entropy".into()).into();
        assert!(matches!(err, LalaError::Internal(_)));
    }

    #[test]
    fn test_exchange_status() {
        let err = ExchangeError::Status {
            status: 400,
            body: "invalid_grant".into(),
        };
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("invalid_grant"));
    }
}
