use std::future::Future;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::types::{AccessToken, OAuthState, Profile};

/// Token and profile returned by a successful code exchange.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: AccessToken,
    pub profile: Profile,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: AccessToken, profile: Profile) -> Self {
        Self {
            access_token,
            profile,
        }
    }
}

/// The two auth calls the dashboard backend serves.
///
/// [`HttpBackend`] is the real implementation; tests and embedders can
/// provide their own.
pub trait AuthBackend: Send + Sync + 'static {
    /// Ask the backend for the Battle.net authorization URL bound to `state`.
    ///
    /// Failures are [`Error::Configuration`].
    fn authorization_url(
        &self,
        state: &OAuthState,
    ) -> impl Future<Output = Result<Url, Error>> + Send;

    /// Exchange a single-use authorization code for a token and profile.
    ///
    /// Failures are [`Error::Exchange`].
    fn exchange_code(
        &self,
        code: &str,
        state: &OAuthState,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;
}

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "http")]
mod http {
    use serde::{Deserialize, Serialize};
    use url::Url;

    use super::{AuthBackend, TokenResponse};
    use crate::config::SessionConfig;
    use crate::error::Error;
    use crate::types::OAuthState;

    #[derive(Serialize)]
    struct AuthorizeRequest<'a> {
        state: &'a str,
    }

    #[derive(Deserialize)]
    struct AuthorizeResponse {
        url: String,
    }

    #[derive(Serialize)]
    struct ExchangeRequest<'a> {
        code: &'a str,
        state: &'a str,
    }

    /// `reqwest`-backed client for the dashboard's auth endpoints.
    pub struct HttpBackend {
        config: SessionConfig,
        http: reqwest::Client,
    }

    impl HttpBackend {
        #[must_use]
        pub fn new(config: SessionConfig) -> Self {
            Self {
                config,
                http: reqwest::Client::new(),
            }
        }

        /// Use a custom HTTP client (for connection pool reuse or testing).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }

        #[must_use]
        pub fn config(&self) -> &SessionConfig {
            &self.config
        }
    }

    impl AuthBackend for HttpBackend {
        async fn authorization_url(&self, state: &OAuthState) -> Result<Url, Error> {
            let endpoint = self.config.authorize_url()?;
            let response = self
                .http
                .post(endpoint)
                .json(&AuthorizeRequest {
                    state: state.as_str(),
                })
                .send()
                .await
                .map_err(|e| Error::Configuration(format!("authorization URL request: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), body = %body, "Authorization URL request rejected");
                return Err(Error::Configuration(format!(
                    "failed to get OAuth URL: {status}"
                )));
            }

            let data: AuthorizeResponse = response
                .json()
                .await
                .map_err(|e| Error::Configuration(format!("malformed authorization response: {e}")))?;

            Url::parse(&data.url)
                .map_err(|e| Error::Configuration(format!("invalid authorization URL: {e}")))
        }

        async fn exchange_code(
            &self,
            code: &str,
            state: &OAuthState,
        ) -> Result<TokenResponse, Error> {
            let endpoint = self
                .config
                .exchange_url()
                .map_err(|e| Error::Exchange {
                    status: None,
                    detail: e.to_string(),
                })?;
            let response = self
                .http
                .post(endpoint)
                .json(&ExchangeRequest {
                    code,
                    state: state.as_str(),
                })
                .send()
                .await
                .map_err(|e| Error::Exchange {
                    status: None,
                    detail: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), body = %body, "Code exchange rejected");
                return Err(Error::Exchange {
                    status: Some(status.as_u16()),
                    detail: status
                        .canonical_reason()
                        .map_or_else(|| status.to_string(), str::to_owned),
                });
            }

            response.json::<TokenResponse>().await.map_err(|e| Error::Exchange {
                status: Some(status.as_u16()),
                detail: format!("malformed token response: {e}"),
            })
        }
    }

}
