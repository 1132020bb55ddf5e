//! The callback route: the page Battle.net sends the browser back to.
//!
//! It checks the callback preconditions itself, only then hands `code` and
//! `state` to [`SessionManager::handle_callback`], and always navigates
//! away afterwards according to the configured [`CallbackFailurePolicy`].

use url::Url;
use url::form_urlencoded;

use crate::backend::AuthBackend;
use crate::config::{CallbackFailurePolicy, SessionConfig};
use crate::error::Error;
use crate::session::SessionManager;
use crate::types::Session;

/// OAuth parameters found in a callback URL. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            // First occurrence wins, like `URLSearchParams::get`.
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// What the callback route did.
#[derive(Debug)]
pub struct CallbackOutcome {
    /// The login result. `Err` if a precondition failed or the exchange did.
    pub result: Result<Session, Error>,
    /// Where the route navigated to.
    pub redirect_to: String,
}

impl CallbackOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run the callback route for `location`.
///
/// Never fails: errors are logged, reported in the outcome, and the user
/// is sent to the landing page or the error page depending on the policy.
pub async fn complete_login<B: AuthBackend>(
    manager: &SessionManager<B>,
    config: &SessionConfig,
    location: &Url,
) -> CallbackOutcome {
    let result = run(manager, location).await;

    let redirect_to = match &result {
        Ok(_) => config.landing_path().to_owned(),
        Err(error) => {
            let code = error_code(error);
            tracing::error!(error = %error, code, "Authentication failed");
            failure_redirect(config, code)
        }
    };
    manager.navigator().navigate(&redirect_to);

    CallbackOutcome {
        result,
        redirect_to,
    }
}

async fn run<B: AuthBackend>(
    manager: &SessionManager<B>,
    location: &Url,
) -> Result<Session, Error> {
    let params = CallbackParams::from_url(location);

    if let Some(error) = params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from Battle.net");
        manager.discard_pending();
        return Err(Error::Exchange {
            status: None,
            detail: format!("{error}: {desc}"),
        });
    }

    let code = params.code.ok_or(Error::MissingParameter("code"))?;
    let state = params.state.ok_or(Error::StateMismatch)?;

    let matches = manager
        .pending_state()
        .is_some_and(|pending| pending.as_str() == state);
    if !matches {
        tracing::warn!("OAuth state mismatch on callback route");
        manager.discard_pending();
        return Err(Error::StateMismatch);
    }

    manager.handle_callback(&code, &state).await
}

fn failure_redirect(config: &SessionConfig, code: &str) -> String {
    match config.failure_policy() {
        CallbackFailurePolicy::RedirectToLanding => config.landing_path().to_owned(),
        CallbackFailurePolicy::RedirectToError { path } => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("error", code)
                .finish();
            format!("{path}?{query}")
        }
    }
}

/// Short machine-readable code for an error, used in `?error=` redirects.
///
/// Always one of a fixed set; provider-supplied text is never echoed back.
#[must_use]
pub fn error_code(error: &Error) -> &'static str {
    match error {
        Error::StateMismatch | Error::MissingParameter("state") => "state_mismatch",
        Error::MissingParameter(_) => "missing_code",
        Error::Exchange { .. } | Error::Configuration(_) => "token_exchange_failed",
        Error::Storage(_) => "storage_failed",
    }
}
