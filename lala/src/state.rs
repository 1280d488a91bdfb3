//! On-disk session state for the command-line shell.
//!
//! A browser keeps PKCE values in `sessionStorage` and tokens in
//! `localStorage`. The shell maps those onto two JSON files in one
//! directory so that `lala login` and `lala callback` can run as separate
//! processes.

use lala_auth::SessionManager;
use lala_core::{AuthConfig, ConfigError, FileStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the state directory.
pub const ENV_STATE_DIR: &str = "LALA_STATE_DIR";

/// State directory used when none is configured.
pub const DEFAULT_STATE_DIR: &str = ".lala";

const SESSION_FILE: &str = "session.json";
const TOKENS_FILE: &str = "tokens.json";

/// Directory holding the shell's session and token files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Use `root` as the state directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read `LALA_STATE_DIR`, defaulting to `.lala`.
    pub fn from_env() -> Self {
        let root = std::env::var(ENV_STATE_DIR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_DIR.to_string());
        Self::new(root)
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store for transient PKCE values.
    pub fn session_store(&self) -> FileStore {
        FileStore::new(self.root.join(SESSION_FILE))
    }

    /// Store for tokens.
    pub fn token_store(&self) -> FileStore {
        FileStore::new(self.root.join(TOKENS_FILE))
    }

    /// Build a session manager over this directory's stores.
    ///
    /// Fails when the identity provider settings are incomplete, so the
    /// shell can refuse to start instead of degrading silently.
    pub fn session_manager(&self, config: AuthConfig) -> Result<SessionManager, ConfigError> {
        SessionManager::builder(config)
            .shared_stores(
                Arc::new(self.session_store()),
                Arc::new(self.token_store()),
            )
            .try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lala_auth::keys;
    use lala_core::KeyValueStore;
    use pretty_assertions::assert_eq;

    fn config() -> AuthConfig {
        AuthConfig::new("auth.example.com", "client-123", "http://localhost:5173")
    }

    #[test]
    fn test_store_paths() {
        let state = StateDir::new("/tmp/lala-state");
        assert_eq!(
            state.session_store().path(),
            Path::new("/tmp/lala-state/session.json")
        );
        assert_eq!(
            state.token_store().path(),
            Path::new("/tmp/lala-state/tokens.json")
        );
    }

    #[test]
    fn test_login_state_survives_process_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateDir::new(dir.path());

        let redirect = state
            .session_manager(config())
            .unwrap()
            .login()
            .unwrap();

        // A fresh manager over the same directory sees the pending attempt.
        let stored = state.session_store().get(keys::PKCE_STATE).unwrap();
        assert_eq!(stored, redirect.query_param("state"));
        assert!(state.token_store().get(keys::ID_TOKEN).unwrap().is_none());
    }

    #[test]
    fn test_incomplete_config_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateDir::new(dir.path());
        assert!(state.session_manager(AuthConfig::default()).is_err());
    }
}
