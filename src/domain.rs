use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a letter sits in the provider's signing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Unsent,
    Sent,
    Viewed,
    Signed,
    Completed,
    Declined,
    Expired,
    Revoked,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Unsent => "unsent",
            SignatureStatus::Sent => "sent",
            SignatureStatus::Viewed => "viewed",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Completed => "completed",
            SignatureStatus::Declined => "declined",
            SignatureStatus::Expired => "expired",
            SignatureStatus::Revoked => "revoked",
        }
    }

    /// Terminal states receive no further provider events in practice.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignatureStatus::Completed
                | SignatureStatus::Declined
                | SignatureStatus::Expired
                | SignatureStatus::Revoked
        )
    }

    /// The provider only serves the executed PDF once everyone has signed.
    pub fn signature_available(&self) -> bool {
        matches!(self, SignatureStatus::Signed | SignatureStatus::Completed)
    }
}

/// Internal approval track, advanced by reconciliation rather than by users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Draft,
    AwaitingExecution,
    Executed,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Draft => "draft",
            ApprovalStatus::AwaitingExecution => "awaiting_execution",
            ApprovalStatus::Executed => "executed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Prospect,
    AwaitingSignature,
    Executed,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Prospect => "prospect",
            ClientStatus::AwaitingSignature => "awaiting_signature",
            ClientStatus::Executed => "executed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementLetter {
    pub id: Option<Uuid>,
    pub client_id: Uuid,
    pub matter_type: String,
    pub provider_document_id: Option<String>,
    pub signature_status: SignatureStatus,
    pub approval_status: ApprovalStatus,
    pub stored_artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub status: ClientStatus,
    pub letter_executed: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Webhook payload as the provider delivers it. The provider sends more
/// fields than these; everything else is ignored on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_type: String,
    #[serde(default)]
    pub document: Option<DocumentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Option<String>,
}

impl InboundEvent {
    pub fn provider_document_id(&self) -> Option<&str> {
        self.document
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Everything the provider needs to open a signature request for one letter.
#[derive(Debug, Clone)]
pub struct SignatureSubmission {
    pub letter_id: Uuid,
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
    pub pdf_bytes: Vec<u8>,
}

/// Caller identity resolved from a bearer token on the on-demand endpoints.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}
