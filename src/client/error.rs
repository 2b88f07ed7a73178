use crate::domain_port::*;
use reqwest::Method;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("the authorization header is managed by the client")]
    AuthorizationPreset,
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token store error: {0}")]
    Store(#[from] TokenStoreError),
    #[error("{method} {path} unauthorized after token refresh")]
    Unauthorized { method: Method, path: String },
    #[error("reauthentication failed: {0}")]
    Reauthentication(#[from] RefreshError),
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the session is gone and the user has to sign in again.
    pub fn is_reauthentication(&self) -> bool {
        matches!(self, ClientError::Reauthentication(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
