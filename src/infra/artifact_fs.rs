use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::app::ports::ArtifactStore;
use crate::error::Result;

/// Local-disk artifact store for development runs without Supabase.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(key.to_string())
    }
}
