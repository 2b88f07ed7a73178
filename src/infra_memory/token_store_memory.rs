use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Slots {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    user: Option<UserProfile>,
}

/// Process-local token store. Everything is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<Slots>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self::from_parts(Some(tokens.access_token), Some(tokens.refresh_token))
    }

    /// Seed either token independently, e.g. a host that only kept the access token.
    pub fn from_parts(
        access_token: Option<AccessToken>,
        refresh_token: Option<RefreshToken>,
    ) -> Self {
        Self {
            slots: Mutex::new(Slots {
                access_token,
                refresh_token,
                user: None,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        // Slots hold plain values; a panicked writer cannot leave them half-updated.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        Ok(self.slots().access_token.clone())
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, TokenStoreError> {
        Ok(self.slots().refresh_token.clone())
    }

    async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        let mut slots = self.slots();
        slots.access_token = Some(tokens.access_token.clone());
        slots.refresh_token = Some(tokens.refresh_token.clone());
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), TokenStoreError> {
        *self.slots() = Slots::default();
        Ok(())
    }

    async fn user(&self) -> Result<Option<UserProfile>, TokenStoreError> {
        Ok(self.slots().user.clone())
    }

    async fn set_user(&self, user: &UserProfile) -> Result<(), TokenStoreError> {
        self.slots().user = Some(user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_all_drops_tokens_and_user() {
        let store = MemoryTokenStore::with_tokens(TokenPair::new("a1", "r1"));
        store
            .set_user(&UserProfile {
                email: Some("amina@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        store.clear_all().await.unwrap();

        assert!(store.access_token().await.unwrap().is_none());
        assert!(store.refresh_token().await.unwrap().is_none());
        assert!(store.user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_tokens_replaces_both() {
        let store = MemoryTokenStore::from_parts(Some(AccessToken("a0".into())), None);
        assert!(store.refresh_token().await.unwrap().is_none());

        store.set_tokens(&TokenPair::new("a1", "r1")).await.unwrap();

        assert_eq!(store.access_token().await.unwrap().unwrap().as_str(), "a1");
        assert_eq!(store.refresh_token().await.unwrap().unwrap().as_str(), "r1");
    }
}
