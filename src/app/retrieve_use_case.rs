use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::app::ports::{ArtifactStore, EsignProvider};
use crate::constants::PDF_CONTENT_TYPE;
use crate::domain::SignatureStatus;
use crate::error::{Result, SyncError};
use crate::idempotency::artifact_key;
use crate::storage::CaseStore;

/// Result of a retrieval. `already_stored` distinguishes the idempotence
/// short-circuit from a fresh download.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub path: String,
    pub already_stored: bool,
}

/// Use case for pulling a fully signed letter out of the provider and
/// persisting it. Safe to invoke any number of times for the same letter:
/// the stored-path check on the letter row is the synchronization point, and
/// the deterministic artifact key makes concurrent uploads converge on one
/// object.
pub struct DocumentRetriever {
    store: Arc<dyn CaseStore>,
    artifacts: Arc<dyn ArtifactStore>,
    provider: Arc<dyn EsignProvider>,
}

impl DocumentRetriever {
    pub fn new(
        store: Arc<dyn CaseStore>,
        artifacts: Arc<dyn ArtifactStore>,
        provider: Arc<dyn EsignProvider>,
    ) -> Self {
        Self {
            store,
            artifacts,
            provider,
        }
    }

    pub async fn retrieve(&self, letter_id: Uuid) -> Result<RetrievalOutcome> {
        // Re-read the row rather than trusting whatever the caller holds;
        // a racing retrieval may have stored the artifact in the meantime.
        let letter = self
            .store
            .find_letter(letter_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", letter_id)))?;

        if let Some(path) = letter.stored_artifact_path {
            debug!("Letter {} already has a stored artifact at {}", letter_id, path);
            crate::observability::metrics::retriever::already_stored();
            return Ok(RetrievalOutcome {
                path,
                already_stored: true,
            });
        }

        let document_id = letter.provider_document_id.as_deref().ok_or_else(|| {
            SyncError::MissingField(format!("provider_document_id on letter {}", letter_id))
        })?;

        let bytes = match self.provider.download_completed_document(document_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                crate::observability::metrics::retriever::download_error();
                return Err(e);
            }
        };
        if bytes.is_empty() {
            crate::observability::metrics::retriever::download_error();
            return Err(SyncError::Upstream {
                message: format!("provider returned an empty body for document {}", document_id),
            });
        }

        let key = artifact_key(letter.client_id, letter_id);
        let uploaded = match self.artifacts.upload(&key, &bytes, PDF_CONTENT_TYPE).await {
            Ok(path) => path,
            Err(e) => {
                crate::observability::metrics::retriever::download_error();
                return Err(e);
            }
        };

        // First writer wins; a concurrent retrieval may have beaten us to the
        // row, in which case its path is the canonical one.
        let path = self.store.record_artifact_path(letter_id, &uploaded).await?;

        // A successful download proves the document is fully executed, even
        // when the completion webhook never arrived.
        if letter.signature_status != SignatureStatus::Completed {
            self.store
                .update_signature_status(letter_id, SignatureStatus::Completed)
                .await?;
        }

        crate::observability::metrics::retriever::download_success();
        crate::observability::metrics::retriever::artifact_bytes(bytes.len());
        info!("Stored signed letter {} at {}", letter_id, path);

        Ok(RetrievalOutcome {
            path,
            already_stored: false,
        })
    }
}
