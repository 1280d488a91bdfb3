//! Hosted UI sign-in for the lala platform.
//!
//! Implements the OAuth 2.0 Authorization Code flow with PKCE (S256) against
//! an Amazon Cognito hosted UI:
//!
//! - [`SessionManager::login`] creates a verifier, challenge and state and
//!   returns the authorization [`Redirect`]
//! - [`SessionManager::handle_auth_callback`] checks the returned state,
//!   exchanges the code and stores the tokens
//! - [`SessionManager::id_token_valid`] and
//!   [`SessionManager::signed_in_identity`] answer who is signed in
//! - [`SessionManager::logout`] clears tokens and returns the hosted UI
//!   logout [`Redirect`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use lala_auth::{CallbackOutcome, SessionManager};
//! use lala_core::{AuthConfig, MemoryStore};
//! use url::Url;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SessionManager::builder(AuthConfig::from_env())
//!     .session_store(MemoryStore::new())
//!     .token_store(MemoryStore::new())
//!     .build();
//!
//! // Send the user to the hosted UI.
//! let redirect = manager.login()?;
//! println!("open {redirect}");
//!
//! // Later, when the browser lands back on the app:
//! let current = Url::parse("http://localhost:5173/?code=abc&state=xyz")?;
//! if let CallbackOutcome::SignedIn { replace_url } = manager.handle_auth_callback(&current).await {
//!     println!("signed in, show {replace_url}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod claims;
pub mod error;
pub mod exchange;
pub mod navigation;
pub mod pkce;
pub mod session;

pub use claims::{IdTokenClaims, SignedInIdentity, FALLBACK_LABEL};
pub use error::{AuthError, ClaimsError, ExchangeError};
pub use exchange::{exchange_code, CodeGrant, TokenResponse};
pub use navigation::{CallbackOutcome, CallbackParams, Redirect, RejectReason};
pub use pkce::LoginAttempt;
pub use session::{keys, SessionManager, SessionManagerBuilder, DEFAULT_CLOCK_SKEW_SECS};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AuthError, CallbackOutcome, Redirect, SessionManager, SignedInIdentity,
    };
}
