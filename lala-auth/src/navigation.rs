//! Navigation values returned to the application shell.
//!
//! The session manager never navigates by itself. `login` and `logout`
//! return a [`Redirect`] the shell must follow, and callback handling returns
//! a [`CallbackOutcome`] carrying the URL that should replace the current
//! history entry.

use std::fmt;
use url::Url;

/// A full-page navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    url: Url,
}

impl Redirect {
    /// Wrap a URL.
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The target URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// First value of a query parameter on the target.
    pub fn query_param(&self, name: &str) -> Option<String> {
        query_param(&self.url, name)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// `code` and `state` read from a redirect back to the application.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code
    pub code: String,
    /// State parameter, if the provider sent one
    pub state: Option<String>,
}

impl CallbackParams {
    /// Extract the callback parameters. Returns `None` on a normal page load
    /// (no `code`, or an empty one).
    pub fn from_url(url: &Url) -> Option<Self> {
        let code = query_param(url, "code").filter(|c| !c.is_empty())?;
        Some(Self {
            code,
            state: query_param(url, "state"),
        })
    }
}

impl fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackParams")
            .field("code", &"<redacted>")
            .field("state", &self.state.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The URL with its query removed; path and fragment are kept.
pub fn clean_url(url: &Url) -> Url {
    let mut clean = url.clone();
    clean.set_query(None);
    clean
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Why a callback was not exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Returned state is absent or differs from the stored one.
    StateMismatch,
    /// No PKCE verifier in session storage.
    MissingVerifier,
    /// Identity provider settings are incomplete.
    Misconfigured,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateMismatch => write!(f, "state mismatch"),
            Self::MissingVerifier => write!(f, "missing PKCE verifier"),
            Self::Misconfigured => write!(f, "identity provider not configured"),
        }
    }
}

/// Result of handling the current URL at application start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Normal page load, nothing to do.
    NotCallback,
    /// The callback was refused before any network request.
    Rejected {
        /// Why.
        reason: RejectReason,
        /// URL to put in place of the current history entry.
        replace_url: Url,
    },
    /// The token endpoint refused the code or could not be reached.
    ExchangeFailed {
        /// HTTP status, if the endpoint answered.
        status: Option<u16>,
        /// URL to put in place of the current history entry.
        replace_url: Url,
    },
    /// Tokens were stored.
    SignedIn {
        /// URL to put in place of the current history entry.
        replace_url: Url,
    },
}

impl CallbackOutcome {
    /// The cleaned URL the shell should swap in without reloading.
    pub fn replace_url(&self) -> Option<&Url> {
        match self {
            Self::NotCallback => None,
            Self::Rejected { replace_url, .. }
            | Self::ExchangeFailed { replace_url, .. }
            | Self::SignedIn { replace_url } => Some(replace_url),
        }
    }

    /// Check whether tokens were stored.
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}
