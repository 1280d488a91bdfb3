//! ID token claims and the signed-in identity derived from them.
//!
//! Claims are decoded without verifying the token signature. This is a UI
//! freshness check; services receiving the token validate it themselves.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::ClaimsError;

/// Label shown when a token carries neither a name nor an email.
pub const FALLBACK_LABEL: &str = "Signed in";

/// Claims read from an ID token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Expiration time (seconds since the Unix epoch).
    ///
    /// Fractional values are accepted and truncated.
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,

    /// Subject (user ID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// User pool username.
    #[serde(
        default,
        rename = "cognito:username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// All other claims.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdTokenClaims {
    /// Decode the payload segment of a JWT.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimsError::Malformed("expected three segments"));
        };
        if payload.is_empty() {
            return Err(ClaimsError::Malformed("empty payload"));
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Check `now < exp - skew` (all in epoch seconds).
    pub fn is_fresh(&self, now: i64, skew_secs: i64) -> bool {
        now < self.exp.saturating_sub(skew_secs)
    }
}

/// JWT NumericDate: an integer or a float, truncated to whole seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumericDate {
        Int(i64),
        Float(f64),
    }

    match NumericDate::deserialize(deserializer)? {
        NumericDate::Int(secs) => Ok(secs),
        NumericDate::Float(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        NumericDate::Float(_) => Err(de::Error::custom("exp is not a finite number")),
    }
}

/// Who is signed in, derived from the current valid ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedInIdentity {
    /// Name, email, username or [`FALLBACK_LABEL`], in that order.
    pub label: String,
    /// The decoded claims.
    pub claims: IdTokenClaims,
}

impl SignedInIdentity {
    /// Build the identity from decoded claims.
    pub fn from_claims(claims: IdTokenClaims) -> Self {
        let label = [&claims.name, &claims.email, &claims.username]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_LABEL.to_string());
        Self { label, claims }
    }

    /// Label truncated to `max` characters, ending with `…` when cut.
    pub fn short_label(&self, max: usize) -> String {
        if self.label.chars().count() <= max {
            return self.label.clone();
        }
        let mut short: String = self.label.chars().take(max.saturating_sub(1)).collect();
        short.push('…');
        short
    }

    /// Hover text: the email when present, otherwise the label.
    pub fn title(&self) -> &str {
        self.claims
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.label)
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::jwt;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_decode_claims() {
        let token = jwt(json!({
            "exp": 1_700_000_000,
            "sub": "user-1",
            "email": "a@x.com",
            "name": "Ava",
            "cognito:username": "ava",
            "aud": "client-123",
        }));
        let claims = IdTokenClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.username.as_deref(), Some("ava"));
        assert_eq!(claims.extra.get("aud"), Some(&json!("client-123")));
    }

    #[test]
    fn test_decode_rejects_missing_exp() {
        let token = jwt(json!({ "email": "a@x.com" }));
        assert!(matches!(
            IdTokenClaims::decode(&token),
            Err(ClaimsError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            IdTokenClaims::decode("not-a-jwt"),
            Err(ClaimsError::Malformed(_))
        ));
        assert!(matches!(
            IdTokenClaims::decode("a..c"),
            Err(ClaimsError::Malformed(_))
        ));
        assert!(matches!(
            IdTokenClaims::decode("a.!!!.c"),
            Err(ClaimsError::Encoding(_))
        ));
        assert!(IdTokenClaims::decode("a.b.c.d").is_err());
    }

    #[rstest]
    #[case(900, 60, true)]
    #[case(939, 60, true)]
    #[case(940, 60, false)]
    #[case(999, 0, true)]
    #[case(1000, 0, false)]
    #[case(1001, 0, false)]
    fn test_is_fresh_respects_skew(#[case] now: i64, #[case] skew: i64, #[case] fresh: bool) {
        let claims = IdTokenClaims::decode(&jwt(json!({ "exp": 1000 }))).unwrap();
        assert_eq!(claims.is_fresh(now, skew), fresh);
    }

    #[test]
    fn test_decode_truncates_fractional_exp() {
        let claims = IdTokenClaims::decode(&jwt(json!({ "exp": 1_700_003_600.5 }))).unwrap();
        assert_eq!(claims.exp, 1_700_003_600);
        assert!(claims.is_fresh(1_700_000_000, 60));
    }

    #[test]
    fn test_decode_rejects_non_numeric_exp() {
        let token = jwt(json!({ "exp": "soon" }));
        assert!(matches!(
            IdTokenClaims::decode(&token),
            Err(ClaimsError::Json(_))
        ));
    }

    #[rstest]
    #[case(json!({ "exp": 1, "name": "Ava", "email": "a@x.com" }), "Ava")]
    #[case(json!({ "exp": 1, "name": "", "email": "a@x.com" }), "a@x.com")]
    #[case(json!({ "exp": 1, "email": "a@x.com" }), "a@x.com")]
    #[case(json!({ "exp": 1, "cognito:username": "ava" }), "ava")]
    #[case(json!({ "exp": 1 }), FALLBACK_LABEL)]
    fn test_label_prefers_name_then_email(#[case] payload: serde_json::Value, #[case] label: &str) {
        let claims = IdTokenClaims::decode(&jwt(payload)).unwrap();
        assert_eq!(SignedInIdentity::from_claims(claims).label, label);
    }

    #[test]
    fn test_short_label_and_title() {
        let claims = IdTokenClaims::decode(&jwt(json!({
            "exp": 1,
            "name": "Avery Longname-Featherstonehaugh",
            "email": "avery@example.com",
        })))
        .unwrap();
        let identity = SignedInIdentity::from_claims(claims);
        let short = identity.short_label(28);
        assert_eq!(short.chars().count(), 28);
        assert!(short.ends_with('…'));
        assert_eq!(identity.short_label(100), identity.label);
        assert_eq!(identity.title(), "avery@example.com");
    }
}
