use url::Url;

use crate::error::Error;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const AUTHORIZE_PATH: &str = "api/auth/battlenet";
const CALLBACK_PATH: &str = "api/auth/battlenet/callback";

/// What the callback route does when completing a login fails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallbackFailurePolicy {
    /// Go to the landing page whether the login worked or not; the error is only logged.
    #[default]
    RedirectToLanding,
    /// Go to `path?error=<code>` so the page can tell the user what happened.
    RedirectToError { path: String },
}

/// Session manager configuration.
///
/// Use [`from_env()`](SessionConfig::from_env) for convention-based setup,
/// or [`new()`](SessionConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) api_base: Url,
    pub(crate) landing_path: String,
    pub(crate) failure_policy: CallbackFailurePolicy,
}

impl SessionConfig {
    /// Create config for the backend at `api_base`.
    #[must_use]
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base,
            landing_path: "/".into(),
            failure_policy: CallbackFailurePolicy::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `BATTLENET_API_BASE`: backend base URL (default `http://localhost:8000`)
    /// - `BATTLENET_LANDING_PATH`: route to land on after a callback (default `/`)
    /// - `BATTLENET_CALLBACK_FAILURE_REDIRECT`: route for failed callbacks; when
    ///   unset, failures land on the landing page like successes do
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `BATTLENET_API_BASE` is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(base) = var("BATTLENET_API_BASE") {
            let url: Url = base
                .parse()
                .map_err(|e| Error::Configuration(format!("BATTLENET_API_BASE: {e}")))?;
            config = config.with_api_base(url);
        }
        if let Some(path) = var("BATTLENET_LANDING_PATH") {
            config = config.with_landing_path(path);
        }
        if let Some(path) = var("BATTLENET_CALLBACK_FAILURE_REDIRECT") {
            config = config.with_failure_policy(CallbackFailurePolicy::RedirectToError { path });
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_api_base(mut self, url: Url) -> Self {
        self.api_base = url;
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: CallbackFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Backend base URL.
    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Route the callback lands on.
    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    #[must_use]
    pub fn failure_policy(&self) -> &CallbackFailurePolicy {
        &self.failure_policy
    }

    /// `POST` endpoint returning the Battle.net authorization URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the base URL cannot be a base.
    pub fn authorize_url(&self) -> Result<Url, Error> {
        self.endpoint(AUTHORIZE_PATH)
    }

    /// `POST` endpoint exchanging `code` + `state` for a token and profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the base URL cannot be a base.
    pub fn exchange_url(&self) -> Result<Url, Error> {
        self.endpoint(CALLBACK_PATH)
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        // Keep any path prefix on the base (`https://host/stats/` + `api/...`).
        let mut base = self.api_base.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| Error::Configuration(format!("invalid API base {}: {e}", self.api_base)))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE.parse().expect("valid default URL"))
    }
}
