use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt token document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence for the credentials of the current session.
///
/// The client only reads tokens on the request path; writes happen when a
/// refresh settles or when the host logs in or out.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<AccessToken>, TokenStoreError>;
    async fn refresh_token(&self) -> Result<Option<RefreshToken>, TokenStoreError>;
    /// Replace both tokens wholesale.
    async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), TokenStoreError>;
    /// Drop tokens and the cached user together.
    async fn clear_all(&self) -> Result<(), TokenStoreError>;

    async fn user(&self) -> Result<Option<UserProfile>, TokenStoreError>;
    async fn set_user(&self, user: &UserProfile) -> Result<(), TokenStoreError>;
}
