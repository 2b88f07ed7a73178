use crate::domain_model::*;
use crate::domain_port::TokenStoreError;

/// Why a refresh cycle failed.
///
/// Every variant has the same consequence: credentials are cleared and the
/// host is told to log out. The outcome is shared by all waiters, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("refresh rejected with status {status}")]
    Rejected { status: u16 },
    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),
    #[error("refresh transport error: {0}")]
    Transport(String),
    #[error("refresh timed out")]
    TimedOut,
    #[error("token store error: {0}")]
    Store(String),
    /// The exchange panicked, or the refresh task died before settling.
    ///
    /// A panicking exchange still signs out. A panic after the outcome was
    /// decided (host callback, store cleanup) releases waiters with this error
    /// and skips sign-out, since the cleanup itself is what failed.
    #[error("refresh task ended without an outcome")]
    Abandoned,
}

impl From<TokenStoreError> for RefreshError {
    fn from(error: TokenStoreError) -> Self {
        RefreshError::Store(error.to_string())
    }
}

#[async_trait::async_trait]
pub trait RefreshTransport: Send + Sync {
    /// Exchange a refresh token for a new pair.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenPair, RefreshError>;
}
