//! Signed-URL uploads.
//!
//! The uploads API hands out short-lived PUT URLs for keys under the caller's
//! own prefix, `uploads/{sub}/`. The client picks the key, asks for a
//! signature with its raw ID token, then PUTs the bytes straight to storage.

use crate::error::{ClientError, ClientResult};
use crate::http::{check_response, read_json};
use lala_auth::SessionManager;
use lala_core::config::ENV_UPLOADS_API;
use lala_core::{Clock, ClientConfig, SharedClock, SystemClock};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Content type used when the caller has none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix shared by every upload key.
pub const UPLOADS_PREFIX: &str = "uploads/";

/// An object key in the uploads bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadKey(String);

impl UploadKey {
    /// Build `uploads/{sub}/{epoch_millis}-{file_name}`.
    ///
    /// Only the final path component of `file_name` is kept.
    pub fn for_user(sub: &str, epoch_millis: i64, file_name: &str) -> ClientResult<Self> {
        if sub.is_empty() || sub.contains('/') || sub == "." || sub == ".." {
            return Err(ClientError::InvalidKey(format!("bad subject {:?}", sub)));
        }
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() || base == "." || base == ".." {
            return Err(ClientError::InvalidKey(format!(
                "bad file name {:?}",
                file_name
            )));
        }
        Ok(Self(format!(
            "{}{}/{}-{}",
            UPLOADS_PREFIX, sub, epoch_millis, base
        )))
    }

    /// Wrap an existing key.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the key lies inside `sub`'s namespace.
    ///
    /// This is the rule a signing endpoint applies before handing out a URL:
    /// the key must start with `uploads/{sub}/`, name an object below it,
    /// and contain no `.` or `..` segments.
    pub fn is_owned_by(&self, sub: &str) -> bool {
        if sub.is_empty() || sub.contains('/') {
            return false;
        }
        let Some(rest) = self
            .0
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|r| r.strip_prefix(sub))
            .and_then(|r| r.strip_prefix('/'))
        else {
            return false;
        };
        !rest.is_empty()
            && rest
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    key: &'a str,
    content_type: &'a str,
}

/// A signed upload target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedUpload {
    /// Pre-signed PUT URL.
    pub url: Url,
    /// Key the URL writes to.
    pub key: UploadKey,
}

/// Client for the uploads API.
#[derive(Debug, Clone)]
pub struct UploadsClient {
    client: Client,
    base: Url,
    session: SessionManager,
    clock: SharedClock,
}

impl UploadsClient {
    /// Create a client for the uploads API rooted at `base`.
    pub fn new(base: Url, session: SessionManager) -> Self {
        Self {
            client: Client::new(),
            base,
            session,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create from `LALA_UPLOADS_API` settings.
    pub fn from_config(config: &ClientConfig, session: SessionManager) -> ClientResult<Self> {
        let base = config
            .uploads_api
            .clone()
            .ok_or(ClientError::NotConfigured(ENV_UPLOADS_API))?;
        Ok(Self::new(base, session))
    }

    /// Use a custom reqwest client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Use a custom clock for key timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn id_token(&self) -> ClientResult<String> {
        self.session.id_token_valid().ok_or(ClientError::NotSignedIn)
    }

    /// Ask the uploads API to sign a PUT for `key`.
    pub async fn sign(&self, key: &UploadKey, content_type: &str) -> ClientResult<SignedUpload> {
        let token = self.id_token()?;
        let url = self.base.join("sign")?;
        debug!(url = %url, key = %key, "Requesting signed upload URL");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&SignRequest {
                key: key.as_str(),
                content_type,
            })
            .send()
            .await?;
        read_json(response).await
    }

    /// Upload `bytes` under a fresh key in the caller's namespace.
    ///
    /// Returns the key the object was stored under.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> ClientResult<UploadKey> {
        let identity = self
            .session
            .signed_in_identity()
            .ok_or(ClientError::NotSignedIn)?;
        let sub = identity.subject().ok_or(ClientError::MissingSubject)?;
        let content_type = content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let key = UploadKey::for_user(sub, self.clock.epoch_millis(), file_name)?;
        let signed = self.sign(&key, content_type).await?;

        let size = bytes.len();
        let response = self
            .client
            .put(signed.url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check_response(response).await?;

        info!(key = %key, size, "Upload complete");
        Ok(key)
    }
}
