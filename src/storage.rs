use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AvatarStoreError {
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Content-addressed avatar blobs. Names are `<sha256>.<ext>`, so saving the
/// same bytes twice is harmless.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<(), AvatarStoreError>;
    async fn load(&self, name: &str) -> Result<(Vec<u8>, String), AvatarStoreError>;
}

/// Reject anything that could escape the store root.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

pub struct FsAvatarStore {
    root: PathBuf,
}

impl FsAvatarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AvatarStore for FsAvatarStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<(), AvatarStoreError> {
        if !is_safe_name(name) {
            return Err(AvatarStoreError::Other(format!("refusing unsafe name '{name}'")));
        }
        let path = self.root.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AvatarStoreError::Other(e.to_string()))?;
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            error!("failed to write avatar '{}': {e}", path.display());
            return Err(AvatarStoreError::Other(e.to_string()));
        }
        info!("stored avatar {name} ({} bytes)", bytes.len());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<(Vec<u8>, String), AvatarStoreError> {
        if !is_safe_name(name) {
            return Err(AvatarStoreError::NotFound);
        }
        let bytes = tokio::fs::read(self.root.join(name)).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AvatarStoreError::NotFound,
            _ => AvatarStoreError::Other(e.to_string()),
        })?;
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((bytes, mime))
    }
}

pub fn build_avatar_store(root: impl Into<PathBuf>) -> Arc<dyn AvatarStore> {
    Arc::new(FsAvatarStore::new(root))
}
