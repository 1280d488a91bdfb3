//! The authentication session manager.
//!
//! Drives the Authorization Code + PKCE handshake against the hosted UI and
//! answers "who is signed in, and with what bearer token" for the rest of the
//! application.
//!
//! Lifecycle of the stored values:
//!
//! - `login` writes a fresh state and verifier to the session store, replacing
//!   any left over from an earlier attempt.
//! - `handle_auth_callback` consumes them: after an exchange is attempted they
//!   are removed whatever the result.
//! - A successful exchange writes the token set to the durable store. A
//!   partial write is rolled back; `logout` clears it.

use chrono::Duration;
use lala_core::{
    AuthConfig, Clock, ConfigError, HostedUiEndpoints, KeyValueStore, MemoryStore,
    SharedClock, SharedStore, StorageResult, SystemClock,
};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::claims::{IdTokenClaims, SignedInIdentity};
use crate::error::{AuthError, ExchangeError};
use crate::exchange::{exchange_code, CodeGrant, TokenResponse};
use crate::navigation::{clean_url, CallbackOutcome, CallbackParams, Redirect, RejectReason};
use crate::pkce::{LoginAttempt, CHALLENGE_METHOD};

/// Storage keys. Stable for the lifetime of a deployment.
pub mod keys {
    /// PKCE verifier (session store).
    pub const PKCE_VERIFIER: &str = "pkce_verifier";
    /// Anti-CSRF state (session store).
    pub const PKCE_STATE: &str = "pkce_state";
    /// ID token (durable store).
    pub const ID_TOKEN: &str = "id_token";
    /// Access token (durable store).
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token (durable store).
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Every durable token key.
    pub const TOKEN_KEYS: [&str; 3] = [ID_TOKEN, ACCESS_TOKEN, REFRESH_TOKEN];
}

/// Scopes requested from the hosted UI.
pub const SCOPES: &str = "openid email profile";

/// Default clock-skew tolerance for ID token expiry.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Authentication session manager.
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: AuthConfig,
    endpoints: Option<HostedUiEndpoints>,
    session_store: SharedStore,
    token_store: SharedStore,
    clock: SharedClock,
    http: Client,
    skew: Duration,
}

impl SessionManager {
    /// Start building a session manager.
    pub fn builder(config: AuthConfig) -> SessionManagerBuilder {
        SessionManagerBuilder::new(config)
    }

    /// Create a manager with in-memory stores and the system clock.
    pub fn new(config: AuthConfig) -> Self {
        Self::builder(config).build()
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Resolve the hosted UI endpoints, validating the configuration first.
    pub fn endpoints(&self) -> Result<HostedUiEndpoints, ConfigError> {
        self.config.validate()?;
        match &self.endpoints {
            Some(endpoints) => Ok(endpoints.clone()),
            None => self.config.endpoints(),
        }
    }

    fn require_endpoints(&self) -> Result<HostedUiEndpoints, AuthError> {
        self.endpoints().map_err(|e| {
            error!(error = %e, "Identity provider configuration is incomplete");
            AuthError::Config(e)
        })
    }

    /// Begin a login.
    ///
    /// Generates a verifier, challenge and state, stores the verifier and
    /// state in the session store, and returns the authorization URL the
    /// shell must navigate to.
    pub fn login(&self) -> Result<Redirect, AuthError> {
        let endpoints = self.require_endpoints()?;
        let attempt = LoginAttempt::generate()?;

        // State goes first: a verifier without its state is never usable.
        self.session_store.set(keys::PKCE_STATE, &attempt.state)?;
        if let Err(e) = self
            .session_store
            .set(keys::PKCE_VERIFIER, &attempt.code_verifier)
        {
            if let Err(e) = self.session_store.remove(keys::PKCE_STATE) {
                warn!(error = %e, "Failed to clear PKCE state");
            }
            return Err(e.into());
        }

        let url = self.authorization_url(&endpoints.authorize, &attempt)?;
        info!(authorize = %endpoints.authorize, "Redirecting to hosted UI for login");
        Ok(Redirect::new(url))
    }

    fn authorization_url(&self, authorize: &Url, attempt: &LoginAttempt) -> Result<Url, AuthError> {
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", SCOPES),
            ("code_challenge_method", CHALLENGE_METHOD),
            ("code_challenge", attempt.code_challenge.as_str()),
            ("state", attempt.state.as_str()),
        ];
        build_url(authorize, &params)
    }

    /// Handle the page URL at application start.
    ///
    /// A no-op unless the URL carries a `code`. Otherwise checks the returned
    /// state against the stored one, exchanges the code, stores the tokens,
    /// and always clears the one-time PKCE values once an exchange has been
    /// attempted. Never fails: every problem is logged and the user simply
    /// stays signed out.
    pub async fn handle_auth_callback(&self, current_url: &Url) -> CallbackOutcome {
        let Some(params) = CallbackParams::from_url(current_url) else {
            return CallbackOutcome::NotCallback;
        };
        let replace_url = clean_url(current_url);

        let endpoints = match self.endpoints() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(error = %e, "Identity provider configuration is incomplete; ignoring callback");
                return CallbackOutcome::Rejected {
                    reason: RejectReason::Misconfigured,
                    replace_url,
                };
            }
        };

        let expected_state = self.read_session(keys::PKCE_STATE);
        let state_matches = match (&expected_state, &params.state) {
            (Some(expected), Some(returned)) => !expected.is_empty() && expected == returned,
            _ => false,
        };
        if !state_matches {
            error!("State mismatch; aborting token exchange");
            return CallbackOutcome::Rejected {
                reason: RejectReason::StateMismatch,
                replace_url,
            };
        }

        let Some(verifier) = self.read_session(keys::PKCE_VERIFIER).filter(|v| !v.is_empty())
        else {
            error!("Missing PKCE verifier; aborting token exchange");
            return CallbackOutcome::Rejected {
                reason: RejectReason::MissingVerifier,
                replace_url,
            };
        };

        let grant = CodeGrant {
            client_id: &self.config.client_id,
            code: &params.code,
            redirect_uri: &self.config.redirect_uri,
            code_verifier: &verifier,
        };

        let outcome = match exchange_code(&self.http, &endpoints.token, &grant).await {
            Ok(tokens) => match self.store_tokens(&tokens) {
                Ok(()) => {
                    info!("Signed in");
                    CallbackOutcome::SignedIn {
                        replace_url: replace_url.clone(),
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to store tokens");
                    CallbackOutcome::ExchangeFailed {
                        status: None,
                        replace_url: replace_url.clone(),
                    }
                }
            },
            Err(ExchangeError::Status { status, body }) => {
                error!(status, body = %body, "Token exchange failed");
                CallbackOutcome::ExchangeFailed {
                    status: Some(status),
                    replace_url: replace_url.clone(),
                }
            }
            Err(e) => {
                error!(error = %e, "Token exchange error");
                CallbackOutcome::ExchangeFailed {
                    status: e.status(),
                    replace_url: replace_url.clone(),
                }
            }
        };

        for key in [keys::PKCE_VERIFIER, keys::PKCE_STATE] {
            if let Err(e) = self.session_store.remove(key) {
                warn!(key, error = %e, "Failed to clear PKCE value");
            }
        }

        outcome
    }

    /// Write the new token set, or leave the previous one in place.
    fn store_tokens(&self, tokens: &TokenResponse) -> StorageResult<()> {
        let mut previous = Vec::with_capacity(keys::TOKEN_KEYS.len());
        for key in keys::TOKEN_KEYS {
            previous.push((key, self.token_store.get(key)?));
        }

        if let Err(e) = self.write_tokens(tokens) {
            self.restore_tokens(&previous);
            return Err(e);
        }
        Ok(())
    }

    fn write_tokens(&self, tokens: &TokenResponse) -> StorageResult<()> {
        self.token_store.set(keys::ID_TOKEN, &tokens.id_token)?;
        self.token_store.set(
            keys::ACCESS_TOKEN,
            tokens.access_token.as_deref().unwrap_or_default(),
        )?;
        // Refresh tokens are not always reissued; keep the previous one.
        if let Some(refresh) = tokens.refresh_token.as_deref().filter(|r| !r.is_empty()) {
            self.token_store.set(keys::REFRESH_TOKEN, refresh)?;
        }
        Ok(())
    }

    /// Put back the previous token set. If that fails too, sign out so that
    /// tokens from two different sign-ins are never mixed.
    fn restore_tokens(&self, previous: &[(&'static str, Option<String>)]) {
        let restored = previous.iter().try_for_each(|(key, value)| match value {
            Some(value) => self.token_store.set(key, value),
            None => self.token_store.remove(key),
        });
        let Err(e) = restored else {
            debug!("Restored previous tokens");
            return;
        };

        error!(error = %e, "Failed to restore previous tokens; signing out");
        for key in keys::TOKEN_KEYS {
            if let Err(e) = self.token_store.remove(key) {
                error!(key, error = %e, "Failed to clear token");
            }
        }
    }

    /// Sign out.
    ///
    /// Clears all stored tokens, then returns the hosted UI logout URL so the
    /// provider's own session ends too.
    pub fn logout(&self) -> Result<Redirect, AuthError> {
        let endpoints = self.require_endpoints()?;

        let mut first_error = None;
        for key in keys::TOKEN_KEYS {
            if let Err(e) = self.token_store.remove(key) {
                error!(key, error = %e, "Failed to clear token");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e.into());
        }

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("logout_uri", self.config.redirect_uri.as_str()),
        ];
        let url = build_url(&endpoints.logout, &params)?;
        info!("Signed out locally; redirecting to hosted UI logout");
        Ok(Redirect::new(url))
    }

    /// The stored ID token, unvalidated.
    pub fn id_token(&self) -> Option<String> {
        match self.token_store.get(keys::ID_TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read ID token");
                None
            }
        }
    }

    /// The stored ID token, only if it decodes and has not expired.
    pub fn id_token_valid(&self) -> Option<String> {
        let token = self.id_token()?;
        let claims = self.fresh_claims(&token)?;
        debug!(exp = claims.exp, "ID token is fresh");
        Some(token)
    }

    /// The signed-in identity, recomputed from the current valid ID token.
    pub fn signed_in_identity(&self) -> Option<SignedInIdentity> {
        let token = self.id_token()?;
        let claims = self.fresh_claims(&token)?;
        Some(SignedInIdentity::from_claims(claims))
    }

    /// `Bearer <id_token>` for downstream API requests, if a token is stored.
    pub fn bearer_authorization(&self) -> Option<String> {
        self.id_token().map(|t| format!("Bearer {}", t))
    }

    /// The stored refresh token, if one was issued.
    pub fn refresh_token(&self) -> Option<String> {
        self.token_store
            .get(keys::REFRESH_TOKEN)
            .ok()
            .flatten()
            .filter(|t| !t.is_empty())
    }

    fn fresh_claims(&self, token: &str) -> Option<IdTokenClaims> {
        let claims = match IdTokenClaims::decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Stored ID token is not decodable");
                return None;
            }
        };
        let now = self.clock.epoch_seconds();
        if claims.is_fresh(now, self.skew.num_seconds()) {
            Some(claims)
        } else {
            debug!(exp = claims.exp, now, "Stored ID token has expired");
            None
        }
    }

    fn read_session(&self, key: &str) -> Option<String> {
        match self.session_store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read session value");
                None
            }
        }
    }
}

fn build_url(base: &Url, params: &[(&str, &str)]) -> Result<Url, AuthError> {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let raw = format!("{}?{}", base, query);
    Url::parse(&raw).map_err(|e| {
        AuthError::Config(ConfigError::invalid_url(
            lala_core::config::ENV_COGNITO_DOMAIN,
            base.as_str(),
            e,
        ))
    })
}

/// Builder for [`SessionManager`].
#[derive(Debug)]
pub struct SessionManagerBuilder {
    config: AuthConfig,
    endpoints: Option<HostedUiEndpoints>,
    session_store: Option<SharedStore>,
    token_store: Option<SharedStore>,
    clock: Option<SharedClock>,
    http: Option<Client>,
    skew: Duration,
}

impl SessionManagerBuilder {
    fn new(config: AuthConfig) -> Self {
        Self {
            config,
            endpoints: None,
            session_store: None,
            token_store: None,
            clock: None,
            http: None,
            skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    /// Store for transient PKCE values (browser `sessionStorage`).
    #[must_use]
    pub fn session_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.session_store = Some(Arc::new(store));
        self
    }

    /// Store for tokens (browser `localStorage`).
    #[must_use]
    pub fn token_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.token_store = Some(Arc::new(store));
        self
    }

    /// Use already-shared stores.
    #[must_use]
    pub fn shared_stores(mut self, session: SharedStore, tokens: SharedStore) -> Self {
        self.session_store = Some(session);
        self.token_store = Some(tokens);
        self
    }

    /// Time source for expiry checks.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// HTTP client for the token exchange.
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Override the hosted UI endpoints (local emulators, tests).
    #[must_use]
    pub fn endpoints(mut self, endpoints: HostedUiEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Clock-skew tolerance applied to `exp`.
    #[must_use]
    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Build the manager.
    ///
    /// An incomplete configuration is reported immediately at `error` level;
    /// `login` and `logout` will refuse to run until it is fixed.
    pub fn build(self) -> SessionManager {
        if let Err(e) = self.config.validate() {
            error!(error = %e, "Identity provider configuration is incomplete");
        }

        SessionManager {
            config: self.config,
            endpoints: self.endpoints,
            session_store: self
                .session_store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            token_store: self
                .token_store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            http: self.http.unwrap_or_default(),
            skew: self.skew,
        }
    }

    /// Build the manager, failing fast on an incomplete configuration.
    pub fn try_build(self) -> Result<SessionManager, ConfigError> {
        self.config.validate()?;
        Ok(self.build())
    }
}
