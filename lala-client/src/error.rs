//! Client error types.

use thiserror::Error;

/// Errors from the platform API clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,

    /// The ID token has no `sub` claim.
    #[error("ID token has no subject")]
    MissingSubject,

    /// A base URL is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// An upload key or file name was rejected.
    #[error("Invalid upload key: {0}")]
    InvalidKey(String),
}

impl ClientError {
    /// Create an API error.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Get the HTTP status if the API answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the API refused the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
