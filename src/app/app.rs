use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_file::*;
use crate::infra_http::*;
use crate::infra_memory::*;
use crate::logger::*;
use crate::session::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Wired-up client stack built from [`Settings`].
pub struct App {
    pub session: Arc<AuthSession>,
}

impl App {
    pub fn try_new(settings: &Settings, host_events: Arc<dyn SessionEvents>) -> anyhow::Result<Self> {
        let base_url: Url = settings.api.base_url.parse()?;
        let timeout = Duration::from_secs(settings.api.timeout_secs);

        let token_store: Arc<dyn TokenStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "file" => {
                let path = settings
                    .store
                    .path
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.path is required by the file backend"))?;
                Arc::new(FileTokenStore::new(path))
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let refresh_url = base_url.join(&settings.api.refresh_path)?;
        let refresh_transport: Arc<dyn RefreshTransport> =
            Arc::new(HttpRefreshTransport::new(refresh_url, timeout)?);

        let session = AuthSession::start(
            ClientConfig { base_url, timeout },
            SessionPaths {
                login: settings.api.login_path.clone(),
                profile: settings.api.profile_path.clone(),
            },
            token_store,
            refresh_transport,
            host_events,
        )?;

        debug!(backend = %settings.store.backend, "client stack ready");

        Ok(Self {
            session: Arc::new(session),
        })
    }

    pub async fn shutdown(&self) {
        debug!("app shutting down...");
        self.session.shutdown().await;
    }
}

/// Host hooks for the command line: there is no UI to redirect, so log instead.
#[derive(Debug, Default)]
pub struct LoggingSessionEvents;

impl SessionEvents for LoggingSessionEvents {
    fn on_token_refreshed(&self, _access_token: &AccessToken) {
        debug!("access token refreshed");
    }

    fn on_logout(&self) {
        warn!("session expired, sign in again");
    }
}
