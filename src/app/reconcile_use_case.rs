use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::ports::Notifier;
use crate::app::retrieve_use_case::DocumentRetriever;
use crate::domain::{ApprovalStatus, EngagementLetter, InboundEvent, SignatureStatus};
use crate::error::{Result, SyncError};
use crate::storage::CaseStore;
use crate::webhook::events::ProviderEvent;

/// What a delivery did to our state. Ignored deliveries still acknowledge
/// successfully; the reason is for logs and metrics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored { reason: &'static str },
    Reconciled { letter_id: Uuid, status: SignatureStatus },
}

/// Use case for folding provider webhook events into letter state.
///
/// The status write is the primary obligation. Everything triggered by a
/// completion (artifact retrieval, approval flag, client record, team
/// notification) is attempted independently and never fails the event.
pub struct ReconcileUseCase {
    store: Arc<dyn CaseStore>,
    retriever: Arc<DocumentRetriever>,
    notifier: Arc<dyn Notifier>,
}

impl ReconcileUseCase {
    pub fn new(
        store: Arc<dyn CaseStore>,
        retriever: Arc<DocumentRetriever>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            retriever,
            notifier,
        }
    }

    pub async fn handle_event(&self, event: &InboundEvent) -> Result<EventOutcome> {
        let provider_event = match ProviderEvent::parse(&event.event_type) {
            Some(e) => e,
            None => {
                info!("Ignoring unhandled event type '{}'", event.event_type);
                crate::observability::metrics::webhook::ignored("unhandled_event_type");
                return Ok(EventOutcome::Ignored {
                    reason: "unhandled_event_type",
                });
            }
        };

        let document_id = match event.provider_document_id() {
            Some(id) => id,
            None => {
                info!("Ignoring '{}' event without a document id", event.event_type);
                crate::observability::metrics::webhook::ignored("missing_document_id");
                return Ok(EventOutcome::Ignored {
                    reason: "missing_document_id",
                });
            }
        };

        let letter = match self
            .store
            .find_letter_by_provider_document_id(document_id)
            .await?
        {
            Some(letter) => letter,
            None => {
                info!("No letter for provider document {}; acknowledging anyway", document_id);
                crate::observability::metrics::webhook::ignored("unknown_document");
                return Ok(EventOutcome::Ignored {
                    reason: "unknown_document",
                });
            }
        };
        let letter_id = letter.id.ok_or_else(|| SyncError::Storage {
            message: format!("letter for document {} has no id", document_id),
        })?;

        // Unconditional overwrite. Provider delivery order is not causal
        // order, and refusing "backwards" transitions risks sticking at a
        // status older than reality. Last write wins.
        let status = provider_event.status();
        self.store.update_signature_status(letter_id, status).await?;
        crate::observability::metrics::webhook::reconciled(status.as_str());
        info!(
            "Letter {} moved to {} on '{}'",
            letter_id,
            status.as_str(),
            event.event_type
        );

        if provider_event.is_completion() {
            self.run_completion_effects(&letter, letter_id).await;
        }

        Ok(EventOutcome::Reconciled { letter_id, status })
    }

    /// Runs the four completion side effects. Each one is attempted even if
    /// the previous ones failed; failures are logged and swallowed so the
    /// provider still sees an acknowledgment.
    async fn run_completion_effects(&self, letter: &EngagementLetter, letter_id: Uuid) {
        if let Err(e) = self.retriever.retrieve(letter_id).await {
            warn!("Completed letter {}: artifact retrieval failed: {}", letter_id, e);
        }

        if let Err(e) = self
            .store
            .update_approval_status(letter_id, ApprovalStatus::Executed)
            .await
        {
            warn!("Completed letter {}: approval update failed: {}", letter_id, e);
        }

        let signed_on = Utc::now().date_naive();
        if let Err(e) = self
            .store
            .mark_client_executed(letter.client_id, signed_on)
            .await
        {
            warn!(
                "Completed letter {}: client {} update failed: {}",
                letter_id, letter.client_id, e
            );
        }

        match self.store.find_client(letter.client_id).await {
            Ok(Some(client)) => {
                self.notifier
                    .letter_executed(&client, &letter.matter_type, signed_on)
                    .await;
            }
            Ok(None) => {
                warn!(
                    "Completed letter {}: client {} not found, skipping notification",
                    letter_id, letter.client_id
                );
            }
            Err(e) => {
                warn!(
                    "Completed letter {}: client lookup for notification failed: {}",
                    letter_id, e
                );
            }
        }
    }
}
