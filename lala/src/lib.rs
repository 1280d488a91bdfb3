//! # lala
//!
//! Client-side sign-in and platform access for the lala fan platform.
//!
//! Users sign in through an Amazon Cognito hosted UI using the OAuth 2.0
//! Authorization Code flow with PKCE. The resulting ID token is kept in a
//! durable store and attached as a bearer token to platform API calls.
//!
//! ## Quick Start
//!
//! ```ignore
//! use lala::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = StateDir::from_env();
//!     let session = state.session_manager(AuthConfig::from_env())?;
//!
//!     match session.signed_in_identity() {
//!         Some(identity) => println!("Signed in as {}", identity.short_label(28)),
//!         None => println!("Open {}", session.login()?),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`lala_core`]: configuration, key-value storage, clock and errors
//! - [`lala_auth`]: PKCE login, callback handling, token validity and logout
//! - [`lala_client`]: bearer-authenticated leaderboard and uploads clients
//!
//! The `lala` binary wraps all of it in a small command-line shell.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod state;

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Configuration, storage, clock and errors.
pub use lala_core as core;

/// Hosted UI sign-in and session management.
pub use lala_auth as auth;

/// Platform API clients.
pub use lala_client as client;

// ============================================================================
// Flat Re-exports
// ============================================================================

pub use lala_core::{
    AuthConfig, ClientConfig, Clock, ConfigError, FileStore, HostedUiEndpoints, KeyValueStore,
    LalaError, MemoryStore, StorageError, SystemClock,
};

pub use lala_auth::{
    AuthError, CallbackOutcome, IdTokenClaims, Redirect, RejectReason, SessionManager,
    SessionManagerBuilder, SignedInIdentity,
};

pub use lala_client::{
    ApiClient, ClientError, FanRow, LeaderboardClient, LeaderboardPage, LeaderboardQuery, MyRank,
    UploadKey, UploadsClient,
};

pub use state::StateDir;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::state::StateDir;
    pub use lala_auth::prelude::*;
    pub use lala_client::prelude::*;
    pub use lala_core::prelude::*;
}
