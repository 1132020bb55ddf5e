use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use url::Url;

use crate::backend::AuthBackend;
use crate::callback::CallbackParams;
use crate::error::{Error, StorageError};
use crate::navigator::{Navigator, strip_callback_params};
use crate::state::generate_state;
use crate::storage::{OAUTH_STATE_KEY, PROFILE_KEY, Storage, TOKEN_KEY};
use crate::types::{AccessToken, OAuthState, Profile, Session};

/// Owns the Battle.net login lifecycle for one client.
///
/// All actions take `&self`; share one manager behind an `Arc` and hand
/// consumers either the manager or a [`subscribe`](Self::subscribe) receiver.
pub struct SessionManager<B> {
    backend: B,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn Navigator>,
    session: watch::Sender<Session>,
    // Pending state kept in memory only when storage refused the write.
    pending: Mutex<Option<OAuthState>>,
}

impl<B: AuthBackend> SessionManager<B> {
    /// Create a manager, restoring any persisted session from `storage`.
    ///
    /// Never fails: unreadable or partial storage starts logged out.
    pub fn new(backend: B, storage: Arc<dyn Storage>, navigator: Arc<dyn Navigator>) -> Self {
        let restored = restore(storage.as_ref());
        let (session, _) = watch::channel(restored);
        Self {
            backend,
            storage,
            navigator,
            session,
            pending: Mutex::new(None),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    /// Bearer token for backend calls. May be stale if another client logged out.
    #[must_use]
    pub fn access_token(&self) -> Option<AccessToken> {
        self.session.borrow().access_token().cloned()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.session.borrow().profile().cloned()
    }

    /// Receiver that sees every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// The `state` of the in-flight login, if any.
    #[must_use]
    pub fn pending_state(&self) -> Option<OAuthState> {
        // The in-memory copy is newer than anything storage still holds.
        if let Some(state) = self.pending_mirror().clone() {
            return Some(state);
        }
        match self.storage.get(OAUTH_STATE_KEY) {
            Ok(state) => state.map(OAuthState::from),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read pending login state");
                None
            }
        }
    }

    /// Start a login: store a fresh `state`, fetch the authorization URL and redirect to it.
    ///
    /// Replaces any earlier pending login. Returns the URL redirected to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the backend cannot supply a URL.
    /// No redirect happens and the session is left as it was.
    pub async fn login(&self) -> Result<Url, Error> {
        let state = generate_state();

        // Must be stored before the redirect unloads us.
        *self.pending_mirror() = None;
        if let Err(e) = self.storage.set(OAUTH_STATE_KEY, state.as_str()) {
            tracing::warn!(error = %e, "Could not persist login state; callback may fail after reload");
            // An older stored state must not stay acceptable.
            if let Err(e) = self.storage.remove(OAUTH_STATE_KEY) {
                tracing::warn!(error = %e, "Could not remove previous login state");
            }
            *self.pending_mirror() = Some(state.clone());
        }

        let url = match self.backend.authorization_url(&state).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Login failed");
                self.discard_pending();
                return Err(e);
            }
        };

        tracing::info!(host = url.host_str().unwrap_or_default(), "Redirecting to Battle.net");
        self.navigator.redirect(&url);
        Ok(url)
    }

    /// Complete a login from the callback's `code` and `state`.
    ///
    /// The pending login is consumed by any call that gets as far as
    /// comparing states, so a `(code, state)` pair can be used once.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingParameter`] if `code` or `state` is empty.
    /// - [`Error::StateMismatch`] if `state` is not the pending login's; the
    ///   backend is not contacted.
    /// - [`Error::Exchange`] if the backend rejects the code.
    ///
    /// On error any prior session is left untouched.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<Session, Error> {
        if code.is_empty() {
            return Err(Error::MissingParameter("code"));
        }
        if state.is_empty() {
            return Err(Error::MissingParameter("state"));
        }

        let state = OAuthState::from(state);
        let pending = self.pending_state();
        self.discard_pending();

        if pending.as_ref() != Some(&state) {
            tracing::warn!(pending = pending.is_some(), "OAuth state mismatch");
            return Err(Error::StateMismatch);
        }

        let token = self
            .backend
            .exchange_code(code, &state)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Callback handling failed"))?;

        if token.access_token.is_empty() {
            tracing::error!("Backend returned an empty access token");
            return Err(Error::Exchange {
                status: None,
                detail: "empty access token".into(),
            });
        }

        let profile = token.profile;
        if let Err(e) = self.persist(&token.access_token, &profile) {
            tracing::warn!(error = %e, "Could not persist session; it will not survive a reload");
            self.forget_persisted_session();
        }

        tracing::info!(battletag = %profile.battletag, id = profile.id, "Battle.net login successful");
        let session = Session::authenticated(token.access_token, profile);
        self.session.send_replace(session.clone());
        Ok(session)
    }

    /// Pick up an OAuth callback present in `location` at startup.
    ///
    /// Does nothing unless both `code` and `state` are present and `state`
    /// matches the pending login. Otherwise runs
    /// [`handle_callback`](Self::handle_callback) and then removes the
    /// callback parameters from the visible address.
    pub async fn resume(&self, location: &Url) -> Option<Result<Session, Error>> {
        let params = CallbackParams::from_url(location);
        let (Some(code), Some(state)) = (params.code, params.state) else {
            return None;
        };
        if self.pending_state().as_ref().map(OAuthState::as_str) != Some(state.as_str()) {
            return None;
        }

        let result = self.handle_callback(&code, &state).await;
        self.navigator.replace_url(&strip_callback_params(location));
        Some(result)
    }

    /// Re-read the persisted session, e.g. after another client logged out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if storage is unreadable or corrupt; the
    /// session is then reset to logged out.
    pub fn reload(&self) -> Result<Session, Error> {
        let session = match try_restore(self.storage.as_ref()) {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not reload session; logging out locally");
                self.session.send_replace(Session::default());
                return Err(e.into());
            }
        };
        self.session.send_replace(session.clone());
        Ok(session)
    }

    /// Forget the session and every persisted auth key. No network effect.
    pub fn logout(&self) {
        for key in [TOKEN_KEY, PROFILE_KEY, OAUTH_STATE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "Could not clear persisted auth data");
            }
        }
        *self.pending_mirror() = None;
        self.session.send_replace(Session::default());
        tracing::info!("Logged out");
    }

    /// Report a backend response status for a call made with the access token.
    ///
    /// On 401/403 the token is treated as stale and the session is logged
    /// out so the user has to log in again. Returns whether that happened.
    pub fn handle_unauthorized(&self, status: u16) -> bool {
        if !matches!(status, 401 | 403) || !self.is_authenticated() {
            return false;
        }
        tracing::warn!(status, "Backend rejected access token; logging out");
        self.logout();
        true
    }

    /// Drop the pending login without completing it.
    pub fn discard_pending(&self) {
        *self.pending_mirror() = None;
        if let Err(e) = self.storage.remove(OAUTH_STATE_KEY) {
            tracing::warn!(error = %e, "Could not remove pending login state");
        }
    }

    fn persist(&self, token: &AccessToken, profile: &Profile) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token.as_str())?;
        self.storage.set(PROFILE_KEY, &serde_json::to_string(profile)?)?;
        Ok(())
    }

    /// Best effort: a token must never be stored next to another login's profile.
    fn forget_persisted_session(&self) {
        for key in [TOKEN_KEY, PROFILE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "Could not clear partially persisted session");
            }
        }
    }

    fn pending_mirror(&self) -> std::sync::MutexGuard<'_, Option<OAuthState>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn restore(storage: &dyn Storage) -> Session {
    match try_restore(storage) {
        Ok(Some(session)) => {
            if let Some(profile) = session.profile() {
                tracing::info!(battletag = %profile.battletag, "Restored Battle.net session");
            }
            session
        }
        Ok(None) => Session::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not restore session; starting logged out");
            Session::default()
        }
    }
}

fn try_restore(storage: &dyn Storage) -> Result<Option<Session>, StorageError> {
    let (Some(token), Some(profile)) = (storage.get(TOKEN_KEY)?, storage.get(PROFILE_KEY)?) else {
        return Ok(None);
    };
    if token.is_empty() {
        return Ok(None);
    }
    let profile: Profile = serde_json::from_str(&profile)?;
    Ok(Some(Session::authenticated(AccessToken::from(token), profile)))
}
