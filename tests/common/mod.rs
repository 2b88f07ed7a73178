#![allow(dead_code)]

use keyrelay::client::*;
use keyrelay::domain_model::*;
use keyrelay::domain_port::*;
use keyrelay::infra_memory::MemoryTokenStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Refresh transport with a fixed answer, an optional delay and a call counter.
pub struct ScriptedRefreshTransport {
    outcome: Result<String, RefreshError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedRefreshTransport {
    pub fn issuing(access_token: &str) -> Self {
        Self {
            outcome: Ok(access_token.to_owned()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: RefreshError) -> Self {
        Self {
            outcome: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RefreshTransport for ScriptedRefreshTransport {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenPair, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            Ok(access) => Ok(TokenPair {
                access_token: AccessToken(access.clone()),
                refresh_token: refresh_token.clone(),
            }),
            Err(e) => Err(e.clone()),
        }
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    refreshed: Mutex<Vec<String>>,
    logouts: AtomicUsize,
}

impl RecordingEvents {
    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed.lock().unwrap().clone()
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl SessionEvents for RecordingEvents {
    fn on_token_refreshed(&self, access_token: &AccessToken) {
        self.refreshed
            .lock()
            .unwrap()
            .push(access_token.as_str().to_owned());
    }

    fn on_logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory store that counts every write.
pub struct CountingStore {
    inner: MemoryTokenStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryTokenStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenStore for CountingStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        self.inner.access_token().await
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, TokenStoreError> {
        self.inner.refresh_token().await
    }

    async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_tokens(tokens).await
    }

    async fn clear_all(&self) -> Result<(), TokenStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.clear_all().await
    }

    async fn user(&self) -> Result<Option<UserProfile>, TokenStoreError> {
        self.inner.user().await
    }

    async fn set_user(&self, user: &UserProfile) -> Result<(), TokenStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_user(user).await
    }
}

pub fn client_config(server_url: &str, timeout: Duration) -> ClientConfig {
    ClientConfig {
        base_url: server_url.parse().unwrap(),
        timeout,
    }
}

pub fn client_for(
    server_url: &str,
    token_store: Arc<dyn TokenStore>,
    refresh_transport: Arc<dyn RefreshTransport>,
    events: Arc<dyn SessionEvents>,
) -> AuthenticatedHttpClient {
    AuthenticatedHttpClient::new(
        client_config(server_url, Duration::from_secs(5)),
        token_store,
        refresh_transport,
        events,
    )
    .unwrap()
}

/// Memory store whose `clear_all` always fails.
pub struct UnclearableStore {
    inner: MemoryTokenStore,
}

impl UnclearableStore {
    pub fn new(inner: MemoryTokenStore) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl TokenStore for UnclearableStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        self.inner.access_token().await
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, TokenStoreError> {
        self.inner.refresh_token().await
    }

    async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        self.inner.set_tokens(tokens).await
    }

    async fn clear_all(&self) -> Result<(), TokenStoreError> {
        Err(std::io::Error::other("store is read-only").into())
    }

    async fn user(&self) -> Result<Option<UserProfile>, TokenStoreError> {
        self.inner.user().await
    }

    async fn set_user(&self, user: &UserProfile) -> Result<(), TokenStoreError> {
        self.inner.set_user(user).await
    }
}

/// HTTP server whose responses can arrive out of order.
///
/// Answers 200 to `Bearer <accepted_token>` and 401 to anything else. Requests
/// to `/slow` are answered after `slow_delay`, everything else at once. Each
/// connection serves one request.
pub async fn spawn_staggered_server(accepted_token: &str, slow_delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = format!("authorization: bearer {}", accepted_token.to_ascii_lowercase());

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let accepted = accepted.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                }

                let head = String::from_utf8_lossy(&buf[..read]).to_ascii_lowercase();
                if head.starts_with("get /slow ") {
                    tokio::time::sleep(slow_delay).await;
                }
                let status = if head.contains(&accepted) {
                    "200 OK"
                } else {
                    "401 Unauthorized"
                };
                let response =
                    format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}
