use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

use crate::backend::{AuthBackend, TokenResponse};
use crate::error::{Error, StorageError};
use crate::navigator::Navigator;
use crate::storage::{MemoryStorage, Storage};
use crate::types::{AccessToken, OAuthState, Profile};

/// Scriptable backend. An empty exchange queue answers `400 Bad Request`,
/// like a backend refusing a used code.
#[derive(Default)]
pub(crate) struct FakeBackend {
    authorize_status: Option<u16>,
    exchanges: Mutex<VecDeque<Result<TokenResponse, u16>>>,
    last_state: Mutex<Option<OAuthState>>,
    pub(crate) authorize_calls: AtomicUsize,
    pub(crate) exchange_calls: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_authorize(mut self, status: u16) -> Self {
        self.authorize_status = Some(status);
        self
    }

    pub(crate) fn with_token(self, token: &str, profile: Profile) -> Self {
        self.exchanges
            .lock()
            .unwrap()
            .push_back(Ok(TokenResponse::new(AccessToken::from(token), profile)));
        self
    }

    pub(crate) fn with_exchange_status(self, status: u16) -> Self {
        self.exchanges.lock().unwrap().push_back(Err(status));
        self
    }

    pub(crate) fn last_state(&self) -> Option<OAuthState> {
        self.last_state.lock().unwrap().clone()
    }
}

impl AuthBackend for FakeBackend {
    async fn authorization_url(&self, state: &OAuthState) -> Result<Url, Error> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_state.lock().unwrap() = Some(state.clone());
        if let Some(status) = self.authorize_status {
            return Err(Error::Configuration(format!("failed to get OAuth URL: {status}")));
        }
        let mut url: Url = "https://oauth.battle.net/authorize".parse().unwrap();
        url.query_pairs_mut().append_pair("state", state.as_str());
        Ok(url)
    }

    async fn exchange_code(&self, _code: &str, _state: &OAuthState) -> Result<TokenResponse, Error> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.exchanges.lock().unwrap().pop_front().unwrap_or(Err(400));
        next.map_err(|status| Error::Exchange {
            status: Some(status),
            detail: format!("status {status}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NavEvent {
    Redirect(Url),
    Replace(Url),
    Navigate(String),
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    events: Mutex<Vec<NavEvent>>,
}

impl RecordingNavigator {
    pub(crate) fn events(&self) -> Vec<NavEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &Url) {
        self.events.lock().unwrap().push(NavEvent::Redirect(url.clone()));
    }

    fn replace_url(&self, url: &Url) {
        self.events.lock().unwrap().push(NavEvent::Replace(url.clone()));
    }

    fn navigate(&self, path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(NavEvent::Navigate(path.to_owned()));
    }
}

/// Storage that is disabled, like a browser with storage blocked.
pub(crate) struct FailingStorage;

impl Storage for FailingStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disabled".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disabled".into()))
    }
}

/// Working storage that refuses writes to some keys, like a quota-full
/// browser store where removals still succeed.
pub(crate) struct RejectingStorage {
    inner: MemoryStorage,
    rejected: Vec<&'static str>,
}

impl RejectingStorage {
    pub(crate) fn rejecting(keys: &[&'static str]) -> Self {
        Self {
            inner: MemoryStorage::new(),
            rejected: keys.to_vec(),
        }
    }

    /// Write around the rejection, for test setup.
    pub(crate) fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value).unwrap();
    }
}

impl Storage for RejectingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.rejected.iter().any(|rejected| *rejected == key) {
            return Err(StorageError::Unavailable(format!("quota exceeded writing {key}")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}
