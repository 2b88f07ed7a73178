use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::*;
use nanoid::nanoid;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relative request paths are joined onto this URL.
    pub base_url: Url,
    /// Applies to every request, the refresh call included.
    pub timeout: Duration,
}

/// HTTP client that owns the `Authorization` header.
///
/// Every request carries the stored access token. A 401 parks the request on
/// the single in-flight refresh (starting one if none is running), then
/// replays it once with the new token. When the refresh fails, credentials are
/// cleared, the host is told to log out and every parked request fails with
/// the same [`RefreshError`].
///
/// Cloning is cheap and clones share the refresh state.
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token_store: Arc<dyn TokenStore>,
    refresh_transport: Arc<dyn RefreshTransport>,
    events: Arc<dyn SessionEvents>,
    refresh_state: std::sync::Mutex<RefreshState>,
}

impl AuthenticatedHttpClient {
    pub fn new(
        config: ClientConfig,
        token_store: Arc<dyn TokenStore>,
        refresh_transport: Arc<dyn RefreshTransport>,
        events: Arc<dyn SessionEvents>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http_client(
            http,
            config,
            token_store,
            refresh_transport,
            events,
        ))
    }

    /// Build on an existing `reqwest::Client` (connection pool reuse).
    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        token_store: Arc<dyn TokenStore>,
        refresh_transport: Arc<dyn RefreshTransport>,
        events: Arc<dyn SessionEvents>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url,
                timeout: config.timeout,
                token_store,
                refresh_transport,
                events,
                refresh_state: std::sync::Mutex::new(RefreshState::Idle),
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh_state().is_refreshing()
    }

    /// Sends `request` with the current access token, recovering once from an
    /// expired token.
    ///
    /// Every response except 401 is returned as-is, whatever its status.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response, ClientError> {
        if request.headers.contains_key(AUTHORIZATION) {
            return Err(ClientError::AuthorizationPreset);
        }

        let span = tracing::debug_span!("api_request", id = %nanoid!(8));
        self.send_authorized(request).instrument(span).await
    }

    /// Like [`send`](Self::send), but fails on non-2xx and decodes the JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        let response = ensure_success(self.send(request).await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Sends without credentials and without the refresh protocol.
    ///
    /// For endpoints such as login, where a 401 means bad credentials rather
    /// than an expired token.
    pub async fn send_anonymous(
        &self,
        request: ApiRequest,
    ) -> Result<reqwest::Response, ClientError> {
        if request.headers.contains_key(AUTHORIZATION) {
            return Err(ClientError::AuthorizationPreset);
        }
        self.dispatch(&request, None).await
    }

    async fn send_authorized(
        &self,
        mut request: ApiRequest,
    ) -> Result<reqwest::Response, ClientError> {
        let mut token = self.current_access_token().await?;

        loop {
            let response = self.dispatch(&request, token.as_ref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if request.has_been_retried() {
                warn!(method = %request.method, path = %request.path, "rejected again after token refresh");
                return Err(ClientError::Unauthorized {
                    method: request.method.clone(),
                    path: request.path.clone(),
                });
            }

            request.mark_retried();

            // A refresh may have completed while this request was in flight.
            // Its token is newer than the one just rejected, so replay with it.
            let current = self.current_access_token().await?;
            token = match current {
                Some(current) if token.as_ref() != Some(&current) => {
                    debug!("token already refreshed, replaying");
                    Some(current)
                }
                _ => Some(self.refreshed_access_token().await?),
            };
        }
    }

    /// Refreshes the access token outside of a 401, joining any refresh
    /// already in flight.
    ///
    /// A failure signs out exactly as it does for a rejected request.
    pub async fn refresh_access_token(&self) -> Result<AccessToken, ClientError> {
        Ok(self.refreshed_access_token().await?)
    }

    async fn current_access_token(&self) -> Result<Option<AccessToken>, ClientError> {
        let token = self.inner.token_store.access_token().await?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Joins the in-flight refresh, starting it when the state is idle.
    async fn refreshed_access_token(&self) -> Result<AccessToken, RefreshError> {
        let (waiter, outcome) = oneshot::channel();

        let leads = self.inner.refresh_state().join(waiter);
        if leads {
            debug!("starting token refresh");
            let inner = self.inner.clone();
            let span = tracing::info_span!("token_refresh");
            tokio::spawn(inner.run_refresh().instrument(span));
        } else {
            debug!("joined in-flight token refresh");
        }

        outcome.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.inner.base_url.join(&request.path)?;
        debug!(method = %request.method, %url, retried = request.has_been_retried(), "dispatching");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder.send().await?)
    }
}

impl Inner {
    fn refresh_state(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Body of the detached refresh task. Exactly one runs per cycle.
    async fn run_refresh(self: Arc<Self>) {
        let mut cycle = RefreshCycle {
            inner: self.clone(),
            outcome: None,
        };

        let exchange = self.clone();
        let mut handle = tokio::spawn(async move { exchange.exchange_refresh_token().await });

        let outcome = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "token refresh task failed");
                Err(RefreshError::Abandoned)
            }
            Err(_) => {
                handle.abort();
                Err(RefreshError::TimedOut)
            }
        };

        match &outcome {
            Ok(access_token) => {
                info!("access token refreshed");
                self.events.on_token_refreshed(access_token);
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, signing out");
                if let Err(e) = self.token_store.clear_all().await {
                    error!(error = %e, "failed to clear credentials");
                }
                self.events.on_logout();
            }
        }

        cycle.outcome = Some(outcome);
    }

    async fn exchange_refresh_token(&self) -> Result<AccessToken, RefreshError> {
        let refresh_token = self
            .token_store
            .refresh_token()
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::MissingRefreshToken)?;

        let tokens = self.refresh_transport.refresh(&refresh_token).await?;
        self.token_store.set_tokens(&tokens).await?;
        Ok(tokens.access_token)
    }
}

/// Settles the refresh state when the refresh task finishes, even by panic.
///
/// Only a panic in a host callback or in clearing the store reaches here
/// without an outcome; those waiters get `Abandoned` and no second sign-out.
struct RefreshCycle {
    inner: Arc<Inner>,
    outcome: Option<RefreshOutcome>,
}

impl Drop for RefreshCycle {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or(Err(RefreshError::Abandoned));
        let waiters = self.inner.refresh_state().settle();
        debug!(waiters = waiters.len(), "releasing refresh waiters");

        for waiter in waiters {
            // A dropped receiver means its caller went away.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Returns the response on 2xx, otherwise an error carrying status and body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { url, status, body })
}
