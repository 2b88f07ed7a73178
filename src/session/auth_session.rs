use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::session::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub login: String,
    pub profile: String,
}

impl Default for SessionPaths {
    fn default() -> Self {
        Self {
            login: "/api/auth/login/".into(),
            profile: "/api/auth/me/".into(),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    role: Option<String>,
}

/// Signed-in state of the application on top of [`AuthenticatedHttpClient`].
///
/// Owns a background worker that refetches the profile whenever the client
/// refreshes the access token. Call [`shutdown`](Self::shutdown) to stop it.
pub struct AuthSession {
    client: AuthenticatedHttpClient,
    token_store: Arc<dyn TokenStore>,
    paths: SessionPaths,
    cancel: CancellationToken,
    sync_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuthSession {
    /// Builds the client and spawns the profile worker; needs a tokio runtime.
    pub fn start(
        config: ClientConfig,
        paths: SessionPaths,
        token_store: Arc<dyn TokenStore>,
        refresh_transport: Arc<dyn RefreshTransport>,
        host_events: Arc<dyn SessionEvents>,
    ) -> Result<Self, SessionError> {
        let (signal_tx, signal_rx) = tokio::sync::mpsc::unbounded_channel();
        let events: Arc<dyn SessionEvents> = Arc::new(SignallingEvents::new(host_events, signal_tx));
        let client =
            AuthenticatedHttpClient::new(config, token_store.clone(), refresh_transport, events)?;

        let cancel = CancellationToken::new();
        let worker = ProfileSync {
            client: client.clone(),
            token_store: token_store.clone(),
            profile_path: paths.profile.clone(),
            signals: signal_rx,
            cancel: cancel.clone(),
        };
        let sync_handle = tokio::spawn(worker.run());

        Ok(Self {
            client,
            token_store,
            paths,
            cancel,
            sync_handle: Mutex::new(Some(sync_handle)),
        })
    }

    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    /// Exchanges credentials for tokens and caches the signed-in user.
    ///
    /// Any failure leaves the store empty.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        match self.try_login(email, password).await {
            Ok(user) => {
                info!("signed in");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                if let Err(cleanup) = self.logout().await {
                    error!(error = %cleanup, "failed to clear credentials after login failure");
                }
                Err(e)
            }
        }
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        let request = ApiRequest::post(self.paths.login.as_str())
            .json(&LoginRequest {
                username: email,
                password,
            })
            .map_err(ClientError::from)?;

        let response = self.client.send_anonymous(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::LoginRejected {
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = response.json().await.map_err(ClientError::from)?;
        let tokens = match (body.access, body.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                TokenPair::new(access, refresh)
            }
            _ => return Err(SessionError::MalformedLogin),
        };
        self.token_store.set_tokens(&tokens).await?;

        let mut user = body.user.unwrap_or_default();
        if user.email.as_deref().is_none_or(str::is_empty) {
            user.email = Some(email.to_owned());
        }
        user.role = body.role.or(user.role);
        self.token_store.set_user(&user).await?;

        Ok(user)
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, SessionError> {
        fetch_and_cache_profile(&self.client, self.token_store.as_ref(), &self.paths.profile).await
    }

    /// Refreshes the access token on demand, then refetches the profile.
    ///
    /// Shares the client's in-flight refresh, if any. Signs out on failure.
    pub async fn refresh_tokens(&self) -> Result<UserProfile, SessionError> {
        let refreshed = match self.client.refresh_access_token().await {
            Ok(_) => self.fetch_profile().await,
            Err(e) => Err(e.into()),
        };

        match refreshed {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!(error = %e, "manual token refresh failed");
                if let Err(cleanup) = self.logout().await {
                    error!(error = %cleanup, "failed to clear credentials after refresh failure");
                }
                Err(e)
            }
        }
    }

    /// Restores a stored session at startup.
    ///
    /// Returns `None` and clears the store when either token is missing or the
    /// profile cannot be fetched.
    pub async fn bootstrap(&self) -> Result<Option<UserProfile>, SessionError> {
        let access = self.token_store.access_token().await?;
        let refresh = self.token_store.refresh_token().await?;
        let has_tokens = access.is_some_and(|t| !t.is_empty()) && refresh.is_some_and(|t| !t.is_empty());
        if !has_tokens {
            self.logout().await?;
            return Ok(None);
        }

        match self.fetch_profile().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "failed to restore session");
                self.logout().await?;
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.token_store.clear_all().await?;
        info!("signed out");
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<UserProfile>, SessionError> {
        Ok(self.token_store.user().await?)
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = match self.sync_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("profile sync handle dropped: {:?}", r);
        }
    }
}
