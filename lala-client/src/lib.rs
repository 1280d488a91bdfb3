//! # lala-client
//!
//! Clients for the lala platform APIs that consume a signed-in session.
//!
//! - **[`ApiClient`]**: JSON transport that attaches the session's bearer token
//! - **[`LeaderboardClient`]**: leaderboard pages, the top-N feed and the caller's rank
//! - **[`UploadsClient`]**: per-user signed-URL uploads
//!
//! ## Example
//!
//! ```ignore
//! use lala_auth::SessionManager;
//! use lala_client::{ApiClient, LeaderboardClient};
//! use lala_core::{AuthConfig, ClientConfig};
//!
//! let session = SessionManager::new(AuthConfig::from_env());
//! let api = ApiClient::from_config(&ClientConfig::from_env()?, session)?;
//!
//! for row in LeaderboardClient::new(api).top(10).await? {
//!     println!("{:>3}  {}  {}", row.rank, row.name, row.points);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod http;
pub mod leaderboard;
pub mod uploads;

pub use error::{ClientError, ClientResult};
pub use http::ApiClient;
pub use leaderboard::{
    FanRow, LeaderboardClient, LeaderboardPage, LeaderboardQuery, LeaderboardRow, MyRank,
    SortDir, SortField, Timeframe,
};
pub use uploads::{SignedUpload, UploadKey, UploadsClient};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ApiClient, ClientError, ClientResult, LeaderboardClient, LeaderboardQuery, UploadKey,
        UploadsClient,
    };
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use lala_auth::{keys, SessionManager};
    use lala_core::{AuthConfig, FixedClock, KeyValueStore, MemoryStore};

    const NOW: i64 = 1_700_000_000;

    fn manager(tokens: MemoryStore) -> SessionManager {
        SessionManager::builder(AuthConfig::new(
            "auth.example.com",
            "client-123",
            "http://localhost:5173",
        ))
        .token_store(tokens)
        .clock(FixedClock::at_epoch_seconds(NOW))
        .build()
    }

    /// A signed-out session.
    pub fn session() -> SessionManager {
        manager(MemoryStore::new())
    }

    /// A session holding an opaque ID token.
    pub fn session_with_token(token: &str) -> SessionManager {
        let tokens = MemoryStore::new();
        tokens.set(keys::ID_TOKEN, token).unwrap();
        manager(tokens)
    }

    /// A session holding a fresh ID token for `sub`; returns the token too.
    pub fn signed_in_session(sub: &str) -> (SessionManager, String) {
        let claims = serde_json::json!({ "exp": NOW + 3600, "sub": sub, "email": "fan@example.com" });
        let token = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        (session_with_token(&token), token)
    }
}
