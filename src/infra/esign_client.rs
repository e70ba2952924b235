use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use crate::app::ports::EsignProvider;
use crate::config::EsignConfig;
use crate::constants::LETTER_FILE_NAME;
use crate::domain::SignatureSubmission;
use crate::error::{Result, SyncError};

#[derive(Debug, Deserialize)]
struct CreateDocumentResponse {
    id: String,
}

/// HTTP client for the e-signature provider's REST API.
pub struct EsignHttpClient {
    client: reqwest::Client,
    config: EsignConfig,
}

impl EsignHttpClient {
    pub fn new(config: EsignConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// The three signing fields every letter carries, positioned from config.
    fn overlay_fields(&self) -> serde_json::Value {
        let overlay = &self.config.overlay;
        json!([
            {
                "type": "signature",
                "page": overlay.page,
                "x": overlay.signature.x,
                "y": overlay.signature.y,
                "recipient": 1
            },
            {
                "type": "printed_name",
                "page": overlay.page,
                "x": overlay.printed_name.x,
                "y": overlay.printed_name.y,
                "recipient": 1
            },
            {
                "type": "date_signed",
                "page": overlay.page,
                "x": overlay.date_signed.x,
                "y": overlay.date_signed.y,
                "recipient": 1
            }
        ])
    }
}

#[async_trait]
impl EsignProvider for EsignHttpClient {
    async fn create_signature_request(&self, submission: &SignatureSubmission) -> Result<String> {
        let body = json!({
            "name": submission.subject,
            "message": submission.message,
            "files": [{
                "name": LETTER_FILE_NAME,
                "file_base64": BASE64.encode(&submission.pdf_bytes),
            }],
            "recipients": [{
                "id": 1,
                "name": submission.recipient_name,
                "email": submission.recipient_email,
            }],
            "fields": self.overlay_fields(),
        });

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint("documents"))
            .header("X-Api-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        crate::observability::metrics::provider::request_duration(
            started.elapsed().as_secs_f64(),
        );

        let status = response.status();
        if !status.is_success() {
            crate::observability::metrics::provider::request_error("create_document");
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Upstream {
                message: format!("document creation failed: {} - {}", status, detail),
            });
        }

        let created: CreateDocumentResponse = response.json().await?;
        crate::observability::metrics::provider::request_success("create_document");
        debug!(
            "Provider opened document {} for letter {}",
            created.id, submission.letter_id
        );
        Ok(created.id)
    }

    async fn download_completed_document(&self, document_id: &str) -> Result<Vec<u8>> {
        let started = Instant::now();
        let response = self
            .client
            .get(self.endpoint(&format!("documents/{}/completed_pdf", document_id)))
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;
        crate::observability::metrics::provider::request_duration(
            started.elapsed().as_secs_f64(),
        );

        let status = response.status();
        if !status.is_success() {
            crate::observability::metrics::provider::request_error("download_completed_pdf");
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Upstream {
                message: format!(
                    "completed pdf download for {} failed: {} - {}",
                    document_id, status, detail
                ),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        crate::observability::metrics::provider::request_success("download_completed_pdf");
        debug!("Downloaded {} bytes for document {}", bytes.len(), document_id);
        Ok(bytes)
    }
}
