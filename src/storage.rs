use crate::domain::{ApprovalStatus, Client, ClientStatus, EngagementLetter, SignatureStatus};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage trait for letters and clients. Every mutation is a single
/// serialized write against the backing store; readers see either the old or
/// the new row, never a partial one.
#[async_trait]
pub trait CaseStore: Send + Sync {
    // Client operations
    async fn create_client(&self, client: &mut Client) -> Result<()>;
    async fn find_client(&self, id: Uuid) -> Result<Option<Client>>;
    async fn update_client_status(&self, client_id: Uuid, status: ClientStatus) -> Result<()>;
    /// Sets the client to Executed and records the execution date in one write.
    async fn mark_client_executed(&self, client_id: Uuid, date: NaiveDate) -> Result<()>;

    // Letter operations
    async fn create_letter(&self, letter: &mut EngagementLetter) -> Result<()>;
    async fn find_letter(&self, id: Uuid) -> Result<Option<EngagementLetter>>;
    /// Resolves a provider document id to the letter it belongs to. Returns
    /// None when no letter matches, and also when more than one does, since
    /// acting on an ambiguous match could update the wrong client's letter.
    async fn find_letter_by_provider_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<EngagementLetter>>;
    /// Set-once. A letter that already has a provider document id keeps it;
    /// the second writer gets a Validation error.
    async fn set_provider_document_id(&self, letter_id: Uuid, document_id: &str) -> Result<()>;
    async fn update_signature_status(
        &self,
        letter_id: Uuid,
        status: SignatureStatus,
    ) -> Result<()>;
    async fn update_approval_status(&self, letter_id: Uuid, status: ApprovalStatus)
        -> Result<()>;
    /// First writer wins. Returns the path actually on the row afterwards,
    /// which callers must treat as canonical even if it is not the one they
    /// passed in.
    async fn record_artifact_path(&self, letter_id: Uuid, path: &str) -> Result<String>;
}

/// In-memory storage implementation for development/testing
pub struct InMemoryCaseStore {
    clients: Arc<Mutex<HashMap<Uuid, Client>>>,
    letters: Arc<Mutex<HashMap<Uuid, EngagementLetter>>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            letters: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn create_client(&self, client: &mut Client) -> Result<()> {
        let id = Uuid::new_v4();
        client.id = Some(id);

        let mut clients = self.clients.lock().unwrap();
        clients.insert(id, client.clone());

        debug!("Created client: {} with id {}", client.name, id);
        Ok(())
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<Client>> {
        let clients = self.clients.lock().unwrap();
        Ok(clients.get(&id).cloned())
    }

    async fn update_client_status(&self, client_id: Uuid, status: ClientStatus) -> Result<()> {
        let mut clients = self.clients.lock().unwrap();
        let client = clients
            .get_mut(&client_id)
            .ok_or_else(|| SyncError::NotFound(format!("client {}", client_id)))?;
        client.status = status;

        debug!("Updated client {} status to {}", client_id, status.as_str());
        Ok(())
    }

    async fn mark_client_executed(&self, client_id: Uuid, date: NaiveDate) -> Result<()> {
        let mut clients = self.clients.lock().unwrap();
        let client = clients
            .get_mut(&client_id)
            .ok_or_else(|| SyncError::NotFound(format!("client {}", client_id)))?;
        client.status = ClientStatus::Executed;
        client.letter_executed = Some(date);

        debug!("Marked client {} executed on {}", client_id, date);
        Ok(())
    }

    async fn create_letter(&self, letter: &mut EngagementLetter) -> Result<()> {
        let id = Uuid::new_v4();
        letter.id = Some(id);

        let mut letters = self.letters.lock().unwrap();
        letters.insert(id, letter.clone());

        debug!("Created letter {} for client {}", id, letter.client_id);
        Ok(())
    }

    async fn find_letter(&self, id: Uuid) -> Result<Option<EngagementLetter>> {
        let letters = self.letters.lock().unwrap();
        Ok(letters.get(&id).cloned())
    }

    async fn find_letter_by_provider_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<EngagementLetter>> {
        let letters = self.letters.lock().unwrap();
        let mut matches = letters
            .values()
            .filter(|l| l.provider_document_id.as_deref() == Some(document_id));

        let first = matches.next().cloned();
        if matches.next().is_some() {
            warn!(
                "Provider document {} maps to multiple letters; refusing to pick one",
                document_id
            );
            return Ok(None);
        }
        Ok(first)
    }

    async fn set_provider_document_id(&self, letter_id: Uuid, document_id: &str) -> Result<()> {
        let mut letters = self.letters.lock().unwrap();
        let letter = letters
            .get_mut(&letter_id)
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", letter_id)))?;

        if letter.provider_document_id.is_some() {
            return Err(SyncError::Validation(format!(
                "letter {} already has a provider document",
                letter_id
            )));
        }
        letter.provider_document_id = Some(document_id.to_string());

        debug!("Letter {} linked to provider document {}", letter_id, document_id);
        Ok(())
    }

    async fn update_signature_status(
        &self,
        letter_id: Uuid,
        status: SignatureStatus,
    ) -> Result<()> {
        let mut letters = self.letters.lock().unwrap();
        let letter = letters
            .get_mut(&letter_id)
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", letter_id)))?;
        letter.signature_status = status;

        debug!("Updated letter {} signature status to {}", letter_id, status.as_str());
        Ok(())
    }

    async fn update_approval_status(
        &self,
        letter_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<()> {
        let mut letters = self.letters.lock().unwrap();
        let letter = letters
            .get_mut(&letter_id)
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", letter_id)))?;
        letter.approval_status = status;

        debug!("Updated letter {} approval status to {}", letter_id, status.as_str());
        Ok(())
    }

    async fn record_artifact_path(&self, letter_id: Uuid, path: &str) -> Result<String> {
        let mut letters = self.letters.lock().unwrap();
        let letter = letters
            .get_mut(&letter_id)
            .ok_or_else(|| SyncError::NotFound(format!("letter {}", letter_id)))?;

        match &letter.stored_artifact_path {
            Some(existing) => Ok(existing.clone()),
            None => {
                letter.stored_artifact_path = Some(path.to_string());
                debug!("Recorded artifact path for letter {}: {}", letter_id, path);
                Ok(path.to_string())
            }
        }
    }
}

/// In-memory artifact store for tests. Counts uploads so retrieval
/// idempotency is observable.
pub struct InMemoryArtifactStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    uploads: AtomicU64,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            uploads: AtomicU64::new(0),
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects.get(key).cloned()
    }
}

#[async_trait]
impl crate::app::ports::ArtifactStore for InMemoryArtifactStore {
    async fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(key.to_string(), bytes.to_vec());
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(key.to_string())
    }
}
