use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::app::ports::EsignProvider;
use crate::domain::{ApprovalStatus, ClientStatus, SignatureStatus, SignatureSubmission};
use crate::error::{Result, SyncError};
use crate::storage::CaseStore;

/// Caller-supplied inputs for sending a letter out for signature. The PDF is
/// rendered elsewhere; this core only moves it along.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub letter_id: Uuid,
    pub signer_name: String,
    pub signer_email: String,
    pub title: String,
    pub message: String,
    pub pdf_bytes: Vec<u8>,
}

/// Use case for opening a signature request with the provider and advancing
/// the letter and client workflow state.
pub struct SubmitUseCase {
    store: Arc<dyn CaseStore>,
    provider: Arc<dyn EsignProvider>,
}

impl SubmitUseCase {
    pub fn new(store: Arc<dyn CaseStore>, provider: Arc<dyn EsignProvider>) -> Self {
        Self { store, provider }
    }

    /// Returns the provider document id on success.
    pub async fn submit(&self, request: SubmitRequest) -> Result<String> {
        if request.pdf_bytes.is_empty() {
            return Err(SyncError::Validation("document payload is empty".to_string()));
        }
        if request.signer_email.is_empty() {
            return Err(SyncError::MissingField("signer_email".to_string()));
        }

        let letter = self
            .store
            .find_letter(request.letter_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", request.letter_id)))?;
        let letter_id = request.letter_id;

        if letter.provider_document_id.is_some() {
            return Err(SyncError::Validation(format!(
                "letter {} was already sent for signature",
                letter_id
            )));
        }

        let submission = SignatureSubmission {
            letter_id,
            recipient_name: request.signer_name,
            recipient_email: request.signer_email,
            subject: request.title,
            message: request.message,
            pdf_bytes: request.pdf_bytes,
        };

        let document_id = match self.provider.create_signature_request(&submission).await {
            Ok(id) => id,
            Err(e) => {
                crate::observability::metrics::send::error();
                return Err(e);
            }
        };

        // Set-once at the store level; if a concurrent submit won the race the
        // Validation error surfaces here and this caller loses.
        self.store
            .set_provider_document_id(letter_id, &document_id)
            .await?;
        self.store
            .update_signature_status(letter_id, SignatureStatus::Sent)
            .await?;
        self.store
            .update_approval_status(letter_id, ApprovalStatus::AwaitingExecution)
            .await?;
        self.store
            .update_client_status(letter.client_id, ClientStatus::AwaitingSignature)
            .await?;

        crate::observability::metrics::send::success();
        info!(
            "Letter {} submitted for signature as provider document {}",
            letter_id, document_id
        );
        Ok(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Client, EngagementLetter};
    use crate::storage::InMemoryCaseStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct MockProvider {
        submissions: Mutex<Vec<SignatureSubmission>>,
        fail: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EsignProvider for MockProvider {
        async fn create_signature_request(
            &self,
            submission: &SignatureSubmission,
        ) -> Result<String> {
            self.submissions.lock().unwrap().push(submission.clone());
            if self.fail {
                Err(SyncError::Upstream {
                    message: "provider rejected the document".to_string(),
                })
            } else {
                Ok(format!("doc-{}", submission.letter_id))
            }
        }

        async fn download_completed_document(&self, _document_id: &str) -> Result<Vec<u8>> {
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    async fn unsent_letter(store: &InMemoryCaseStore) -> (Uuid, Uuid) {
        let mut client = Client {
            id: None,
            name: "Harriet Doyle".to_string(),
            email: "harriet@example.com".to_string(),
            status: ClientStatus::Prospect,
            letter_executed: None,
            created_at: Utc::now(),
        };
        store.create_client(&mut client).await.unwrap();
        let client_id = client.id.unwrap();

        let mut letter = EngagementLetter {
            id: None,
            client_id,
            matter_type: "estate-planning".to_string(),
            provider_document_id: None,
            signature_status: SignatureStatus::Unsent,
            approval_status: ApprovalStatus::Draft,
            stored_artifact_path: None,
            created_at: Utc::now(),
        };
        store.create_letter(&mut letter).await.unwrap();
        (client_id, letter.id.unwrap())
    }

    fn request(letter_id: Uuid) -> SubmitRequest {
        SubmitRequest {
            letter_id,
            signer_name: "Harriet Doyle".to_string(),
            signer_email: "harriet@example.com".to_string(),
            title: "Engagement Letter".to_string(),
            message: "Please review and sign.".to_string(),
            pdf_bytes: b"%PDF-1.7 draft".to_vec(),
        }
    }

    #[tokio::test]
    async fn submit_links_the_document_and_advances_all_statuses() {
        let store = Arc::new(InMemoryCaseStore::new());
        let provider = Arc::new(MockProvider::new());
        let (client_id, letter_id) = unsent_letter(&store).await;

        let use_case = SubmitUseCase::new(store.clone(), provider.clone());
        let document_id = use_case.submit(request(letter_id)).await.unwrap();

        let letter = store.find_letter(letter_id).await.unwrap().unwrap();
        assert_eq!(letter.provider_document_id, Some(document_id));
        assert_eq!(letter.signature_status, SignatureStatus::Sent);
        assert_eq!(letter.approval_status, ApprovalStatus::AwaitingExecution);

        let client = store.find_client(client_id).await.unwrap().unwrap();
        assert_eq!(client.status, ClientStatus::AwaitingSignature);
        assert_eq!(provider.submission_count(), 1);
    }

    #[tokio::test]
    async fn second_submit_is_rejected_without_a_provider_call() {
        let store = Arc::new(InMemoryCaseStore::new());
        let provider = Arc::new(MockProvider::new());
        let (_client_id, letter_id) = unsent_letter(&store).await;

        let use_case = SubmitUseCase::new(store.clone(), provider.clone());
        use_case.submit(request(letter_id)).await.unwrap();
        let second = use_case.submit(request(letter_id)).await;

        assert!(matches!(second, Err(SyncError::Validation(_))));
        assert_eq!(provider.submission_count(), 1);
    }

    #[tokio::test]
    async fn provider_failure_leaves_the_letter_unsent() {
        let store = Arc::new(InMemoryCaseStore::new());
        let provider = Arc::new(MockProvider::failing());
        let (client_id, letter_id) = unsent_letter(&store).await;

        let use_case = SubmitUseCase::new(store.clone(), provider.clone());
        let result = use_case.submit(request(letter_id)).await;

        assert!(matches!(result, Err(SyncError::Upstream { .. })));
        let letter = store.find_letter(letter_id).await.unwrap().unwrap();
        assert!(letter.provider_document_id.is_none());
        assert_eq!(letter.signature_status, SignatureStatus::Unsent);
        let client = store.find_client(client_id).await.unwrap().unwrap();
        assert_eq!(client.status, ClientStatus::Prospect);
    }

    #[tokio::test]
    async fn unknown_letter_is_not_found() {
        let store = Arc::new(InMemoryCaseStore::new());
        let provider = Arc::new(MockProvider::new());

        let use_case = SubmitUseCase::new(store, provider.clone());
        let result = use_case.submit(request(Uuid::new_v4())).await;

        assert!(matches!(result, Err(SyncError::NotFound(_))));
        assert_eq!(provider.submission_count(), 0);
    }

    #[tokio::test]
    async fn empty_document_is_rejected_up_front() {
        let store = Arc::new(InMemoryCaseStore::new());
        let provider = Arc::new(MockProvider::new());
        let (_client_id, letter_id) = unsent_letter(&store).await;

        let use_case = SubmitUseCase::new(store, provider.clone());
        let mut req = request(letter_id);
        req.pdf_bytes.clear();
        let result = use_case.submit(req).await;

        assert!(matches!(result, Err(SyncError::Validation(_))));
        assert_eq!(provider.submission_count(), 0);
    }
}
