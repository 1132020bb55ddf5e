//! End-to-end login against a mocked dashboard backend.

#![cfg(feature = "http")]

use std::sync::{Arc, Mutex};

use battlenet_session::storage::{OAUTH_STATE_KEY, PROFILE_KEY, TOKEN_KEY};
use battlenet_session::{
    Error, FileStorage, HttpBackend, Navigator, SessionConfig, SessionManager, Storage,
    complete_login,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Default)]
struct Browser {
    redirects: Mutex<Vec<Url>>,
    routes: Mutex<Vec<String>>,
}

impl Navigator for Browser {
    fn redirect(&self, url: &Url) {
        self.redirects.lock().unwrap().push(url.clone());
    }

    fn replace_url(&self, _url: &Url) {}

    fn navigate(&self, path: &str) {
        self.routes.lock().unwrap().push(path.to_owned());
    }
}

fn new_manager(
    server: &MockServer,
    storage: Arc<FileStorage>,
) -> (SessionManager<HttpBackend>, Arc<Browser>, SessionConfig) {
    let config = SessionConfig::new(server.uri().parse().unwrap());
    let browser = Arc::new(Browser::default());
    let manager = SessionManager::new(HttpBackend::new(config.clone()), storage, browser.clone());
    (manager, browser, config)
}

#[tokio::test]
async fn login_callback_reload_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/battlenet"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = req.body_json().unwrap();
            let state = body["state"].as_str().unwrap().to_owned();
            ResponseTemplate::new(200).set_body_json(json!({
                "url": format!("https://oauth.battle.net/authorize?state={state}")
            }))
        })
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/battlenet/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "bnet-token",
            "profile": { "id": 1337, "battletag": "Illidan#1337" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("session.json")));

    // Sign in: state stored, browser sent to Battle.net.
    let (manager, browser, config) = new_manager(&server, storage.clone());
    manager.login().await.unwrap();
    let state = storage.get(OAUTH_STATE_KEY).unwrap().unwrap();
    let redirects = browser.redirects.lock().unwrap().clone();
    assert_eq!(redirects.len(), 1);
    assert!(redirects[0].query_pairs().any(|(k, v)| k == "state" && v == state));

    // Back on the callback route after the redirect: a fresh page load.
    let (manager, browser, _) = new_manager(&server, storage.clone());
    assert!(!manager.is_authenticated());
    let location: Url = format!("http://localhost/auth/callback?code=abc&state={state}")
        .parse()
        .unwrap();
    let outcome = complete_login(&manager, &config, &location).await;
    assert!(outcome.is_success());
    assert_eq!(*browser.routes.lock().unwrap(), vec!["/".to_owned()]);
    assert_eq!(
        manager.profile().map(|p| p.battletag),
        Some("Illidan#1337".to_owned())
    );
    assert_eq!(storage.get(OAUTH_STATE_KEY).unwrap(), None);

    // Reload: restored from storage, no backend calls (mocks expect exactly one each).
    let (reloaded, _, _) = new_manager(&server, storage.clone());
    assert!(reloaded.is_authenticated());
    assert_eq!(
        reloaded.access_token().map(|t| t.as_str().to_owned()),
        Some("bnet-token".to_owned())
    );

    // Replaying the same callback fails and does not authenticate anyone new.
    reloaded.logout();
    let outcome = complete_login(&reloaded, &config, &location).await;
    assert!(matches!(outcome.result, Err(Error::StateMismatch)));
    assert!(!reloaded.is_authenticated());

    for key in [OAUTH_STATE_KEY, TOKEN_KEY, PROFILE_KEY] {
        assert_eq!(storage.get(key).unwrap(), None);
    }
}

#[tokio::test]
async fn login_with_failing_backend_does_not_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/battlenet"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("session.json")));
    let (manager, browser, _) = new_manager(&server, storage);

    let err = manager.login().await.unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert!(browser.redirects.lock().unwrap().is_empty());
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn logout_in_one_tab_is_seen_by_the_next_load() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("session.json")));
    storage.set(TOKEN_KEY, "tok").unwrap();
    storage
        .set(PROFILE_KEY, r#"{"id":9,"battletag":"Tyrande#9"}"#)
        .unwrap();

    let (tab_a, _, _) = new_manager(&server, Arc::new(FileStorage::new(storage.path())));
    let (tab_b, _, _) = new_manager(&server, Arc::new(FileStorage::new(storage.path())));
    assert!(tab_a.is_authenticated() && tab_b.is_authenticated());

    tab_a.logout();

    // Other tabs keep their in-memory token until told otherwise.
    assert!(tab_b.is_authenticated());
    assert!(!tab_b.reload().unwrap().is_authenticated());
    assert!(!tab_b.is_authenticated());

    let (tab_c, _, _) = new_manager(&server, storage);
    assert!(!tab_c.is_authenticated());
}
