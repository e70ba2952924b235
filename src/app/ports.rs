use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Client, Principal, SignatureSubmission};
use crate::error::Result;

/// Blob storage for signed letter PDFs. Returns the path the object lives at.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// The e-signature provider's API surface, as much of it as we use.
#[async_trait]
pub trait EsignProvider: Send + Sync {
    /// Opens a signature request and returns the provider's document id.
    async fn create_signature_request(&self, submission: &SignatureSubmission) -> Result<String>;
    /// Fetches the fully executed PDF. Only available once signing finished.
    async fn download_completed_document(&self, document_id: &str) -> Result<Vec<u8>>;
}

/// Best-effort outbound notification. Implementations log and swallow their
/// own failures; callers get no say in the matter.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn letter_executed(&self, client: &Client, matter_type: &str, signed_on: NaiveDate);
}

/// Resolves a bearer token to the staff member behind it.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Result<Principal>;
}
