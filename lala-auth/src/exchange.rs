//! Authorization code exchange against the token endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ExchangeError;

/// Token response from the token endpoint.
///
/// `id_token` is required: a 2xx body without it is a decode failure and
/// nothing gets stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Form fields for an `authorization_code` grant.
#[derive(Debug, Clone, Copy)]
pub struct CodeGrant<'a> {
    pub client_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

impl CodeGrant<'_> {
    fn form(&self) -> [(&'static str, &str); 5] {
        [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id),
            ("code", self.code),
            ("redirect_uri", self.redirect_uri),
            ("code_verifier", self.code_verifier),
        ]
    }
}

/// Exchange an authorization code for tokens.
///
/// One request, no retries and no timeout beyond the client's own.
pub async fn exchange_code(
    client: &Client,
    token_url: &Url,
    grant: &CodeGrant<'_>,
) -> Result<TokenResponse, ExchangeError> {
    debug!(url = %token_url, "Exchanging authorization code");

    let response = client
        .post(token_url.clone())
        .header("Content-Type", "application/x-www-form-urlencoded")
        .form(&grant.form())
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ExchangeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
