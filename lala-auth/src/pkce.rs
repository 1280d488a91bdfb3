//! PKCE material for a single login attempt.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Random bytes behind a code verifier (encodes to 86 characters).
pub const VERIFIER_BYTES: usize = 64;

/// Random bytes behind an anti-CSRF state value (encodes to 43 characters).
pub const STATE_BYTES: usize = 32;

/// The only challenge method this client sends.
pub const CHALLENGE_METHOD: &str = "S256";

/// Verifier, challenge and state generated for one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    /// PKCE code verifier, kept in session storage until the exchange
    pub code_verifier: String,
    /// base64url(SHA-256(verifier)), sent with the authorization request
    pub code_challenge: String,
    /// Anti-CSRF state echoed back by the identity provider
    pub state: String,
}

impl LoginAttempt {
    /// Generate fresh PKCE parameters from the OS random source.
    pub fn generate() -> Result<Self, AuthError> {
        let code_verifier = random_token(VERIFIER_BYTES)?;
        let code_challenge = code_challenge(&code_verifier);
        let state = random_token(STATE_BYTES)?;

        Ok(Self {
            code_verifier,
            code_challenge,
            state,
        })
    }
}

impl std::fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .field("state", &"<redacted>")
            .finish()
    }
}

/// Generate `bytes` random bytes, base64url-encoded without padding.
pub fn random_token(bytes: usize) -> Result<String, AuthError> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf).map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Compute the S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_generate_lengths() {
        let attempt = LoginAttempt::generate().unwrap();
        assert_eq!(attempt.code_verifier.len(), 86);
        assert_eq!(attempt.code_challenge.len(), 43);
        assert_eq!(attempt.state.len(), 43);
        assert!((43..=128).contains(&attempt.code_verifier.len()));
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let attempt = LoginAttempt::generate().unwrap();
        let digest = Sha256::digest(attempt.code_verifier.as_bytes());
        assert_eq!(attempt.code_challenge, URL_SAFE_NO_PAD.encode(digest));
        assert!(!attempt.code_challenge.contains('='));
        assert!(is_url_safe(&attempt.code_challenge));
        assert!(is_url_safe(&attempt.code_verifier));
        assert!(is_url_safe(&attempt.state));
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_attempts_are_unique() {
        let a = LoginAttempt::generate().unwrap();
        let b = LoginAttempt::generate().unwrap();
        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let attempt = LoginAttempt::generate().unwrap();
        let debug = format!("{:?}", attempt);
        assert!(!debug.contains(&attempt.code_verifier));
        assert!(!debug.contains(&attempt.state));
    }
}
