use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Anti-CSRF nonce tying a login initiation to its callback.
///
/// Compared with exact, case-sensitive string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct OAuthState(pub String);

impl OAuthState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OAuthState {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque bearer token issued by the backend after a successful exchange.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Minimal Battle.net identity returned by the code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub battletag: String,
}

impl Profile {
    #[must_use]
    pub fn new(id: u64, battletag: impl Into<String>) -> Self {
        Self {
            id,
            battletag: battletag.into(),
        }
    }
}

/// Read-only snapshot of the current session.
///
/// Consumers never mutate this directly; changes go through
/// [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<AccessToken>,
    profile: Option<Profile>,
}

impl Session {
    /// An authenticated session. Returns an empty session if `access_token` is empty.
    #[must_use]
    pub fn authenticated(access_token: AccessToken, profile: Profile) -> Self {
        if access_token.is_empty() {
            return Self::default();
        }
        Self {
            access_token: Some(access_token),
            profile: Some(profile),
        }
    }

    /// True iff a non-empty access token and a profile are both present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(
            (&self.access_token, &self.profile),
            (Some(token), Some(_)) if !token.is_empty()
        )
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }
}
