use crate::domain_model::*;
use crate::domain_port::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

/// Calls the token-refresh endpoint: `POST { "refresh": .. }` -> `{ "access": .. }`.
///
/// The server normally keeps the refresh token as-is, so the presented one is
/// carried over into the returned pair. A `refresh` field in the response
/// replaces it.
pub struct HttpRefreshTransport {
    http: reqwest::Client,
    refresh_url: Url,
}

impl HttpRefreshTransport {
    pub fn new(refresh_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, refresh_url })
    }

    /// Use a custom HTTP client (connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait::async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenPair, RefreshError> {
        let response = self
            .http
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh: refresh_token.as_str(),
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        let access = body
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RefreshError::MalformedResponse("missing access token".into()))?;
        let refresh = body
            .refresh
            .filter(|token| !token.is_empty())
            .map(RefreshToken)
            .unwrap_or_else(|| refresh_token.clone());

        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: refresh,
        })
    }
}
