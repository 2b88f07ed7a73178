use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(default)]
    access_token: Option<AccessToken>,
    #[serde(default)]
    refresh_token: Option<RefreshToken>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Token store backed by a single JSON document on disk.
///
/// Writes go to a sibling temp file which is then renamed over the document,
/// so readers never observe a partially written file. The document is created
/// on first write and removed by `clear_all`.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<TokenDocument, TokenStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TokenDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, mut document: TokenDocument) -> Result<(), TokenStoreError> {
        document.updated_at = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&document)?).await?;

        // Owner read/write only, set before the document becomes visible.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp, permissions).await?;
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Unique per write, so stores sharing a path never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", nanoid::nanoid!(8)));
        self.path.with_file_name(name)
    }

    async fn update<F>(&self, apply: F) -> Result<(), TokenStoreError>
    where
        F: FnOnce(&mut TokenDocument) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        apply(&mut document);
        self.save(document).await
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        Ok(self.load().await?.access_token)
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, TokenStoreError> {
        Ok(self.load().await?.refresh_token)
    }

    async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        let tokens = tokens.clone();
        self.update(move |document| {
            document.access_token = Some(tokens.access_token);
            document.refresh_token = Some(tokens.refresh_token);
        })
        .await
    }

    async fn clear_all(&self) -> Result<(), TokenStoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn user(&self) -> Result<Option<UserProfile>, TokenStoreError> {
        Ok(self.load().await?.user)
    }

    async fn set_user(&self, user: &UserProfile) -> Result<(), TokenStoreError> {
        let user = user.clone();
        self.update(move |document| document.user = Some(user)).await
    }
}
