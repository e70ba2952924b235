use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::app::ports::ArtifactStore;
use crate::config::SupabaseConfig;
use crate::error::{Result, SyncError};

/// Signed-letter storage on Supabase Storage. Upserting makes repeat uploads
/// to the same key harmless; the deterministic key does the deduplication.
pub struct SupabaseArtifactStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseArtifactStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ArtifactStore for SupabaseArtifactStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let endpoint = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket,
            key
        );

        let response = self
            .client
            .put(&endpoint)
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .header(CONTENT_TYPE, content_type)
            .query(&[("upsert", "true")])
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| SyncError::Storage {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage {
                message: format!("Supabase upload failed: {} - {}", status, body),
            });
        }

        debug!("Uploaded {} bytes to {}/{}", bytes.len(), self.config.bucket, key);
        Ok(key.to_string())
    }
}
