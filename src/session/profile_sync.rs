use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::session::SessionError;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    TokenRefreshed,
    LoggedOut,
}

/// Forwards refresh notifications to the host, then wakes the profile worker.
pub struct SignallingEvents {
    host: Arc<dyn SessionEvents>,
    signals: UnboundedSender<SessionSignal>,
}

impl SignallingEvents {
    pub fn new(host: Arc<dyn SessionEvents>, signals: UnboundedSender<SessionSignal>) -> Self {
        Self { host, signals }
    }
}

impl SessionEvents for SignallingEvents {
    fn on_token_refreshed(&self, access_token: &AccessToken) {
        self.host.on_token_refreshed(access_token);
        // Closed only after the worker stopped; nothing left to refetch for.
        let _ = self.signals.send(SessionSignal::TokenRefreshed);
    }

    fn on_logout(&self) {
        self.host.on_logout();
        let _ = self.signals.send(SessionSignal::LoggedOut);
    }
}

pub(crate) struct ProfileSync {
    pub(crate) client: AuthenticatedHttpClient,
    pub(crate) token_store: Arc<dyn TokenStore>,
    pub(crate) profile_path: String,
    pub(crate) signals: UnboundedReceiver<SessionSignal>,
    pub(crate) cancel: CancellationToken,
}

impl ProfileSync {
    pub(crate) async fn run(mut self) {
        loop {
            let signal = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("profile sync shutting down");
                    break;
                }
                signal = self.signals.recv() => signal,
            };

            match signal {
                Some(SessionSignal::TokenRefreshed) => {
                    match fetch_and_cache_profile(
                        &self.client,
                        self.token_store.as_ref(),
                        &self.profile_path,
                    )
                    .await
                    {
                        Ok(_) => debug!("profile refetched after token refresh"),
                        Err(e) => warn!(error = %e, "failed to refetch profile"),
                    }
                }
                Some(SessionSignal::LoggedOut) => {
                    info!("session ended by failed token refresh");
                }
                None => break,
            }
        }
    }
}

pub(crate) async fn fetch_and_cache_profile(
    client: &AuthenticatedHttpClient,
    token_store: &dyn TokenStore,
    profile_path: &str,
) -> Result<UserProfile, SessionError> {
    let user: UserProfile = client.send_json(ApiRequest::get(profile_path)).await?;
    token_store.set_user(&user).await?;
    Ok(user)
}
