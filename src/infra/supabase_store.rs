use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::domain::{ApprovalStatus, Client, ClientStatus, EngagementLetter, SignatureStatus};
use crate::error::{Result, SyncError};
use crate::storage::CaseStore;

const LETTERS_TABLE: &str = "engagement_letters";
const CLIENTS_TABLE: &str = "clients";

fn storage_err(e: reqwest::Error) -> SyncError {
    SyncError::Storage {
        message: e.to_string(),
    }
}

/// Letter and client persistence on Supabase, driven through PostgREST.
/// Only point lookups and single-row updates; conditional filters stand in
/// for transactions where set-once semantics matter.
pub struct SupabaseCaseStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseCaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.endpoint(table))
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await
            .map_err(storage_err)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage {
                message: format!("select from {} failed: {} - {}", table, status, detail),
            });
        }
        response.json::<Vec<T>>().await.map_err(storage_err)
    }

    /// PATCH with the given filters; returns the rows actually updated.
    async fn update(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: Value,
    ) -> Result<Vec<Value>> {
        let response = self
            .client
            .patch(self.endpoint(table))
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .header("Prefer", "return=representation")
            .query(filters)
            .json(&body)
            .send()
            .await
            .map_err(storage_err)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage {
                message: format!("update on {} failed: {} - {}", table, status, detail),
            });
        }
        response.json::<Vec<Value>>().await.map_err(storage_err)
    }

    async fn insert<T: DeserializeOwned>(&self, table: &str, body: Value) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint(table))
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(storage_err)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage {
                message: format!("insert into {} failed: {} - {}", table, status, detail),
            });
        }

        let rows: Vec<T> = response.json().await.map_err(storage_err)?;
        rows.into_iter().next().ok_or_else(|| SyncError::Storage {
            message: format!("insert into {} returned no row", table),
        })
    }

    fn id_filter(id: Uuid) -> Vec<(&'static str, String)> {
        vec![("id", format!("eq.{}", id))]
    }
}

#[async_trait]
impl CaseStore for SupabaseCaseStore {
    async fn create_client(&self, client: &mut Client) -> Result<()> {
        let inserted: Client = self
            .insert(
                CLIENTS_TABLE,
                json!({
                    "name": client.name,
                    "email": client.email,
                    "status": client.status,
                    "letter_executed": client.letter_executed,
                    "created_at": client.created_at,
                }),
            )
            .await?;
        client.id = inserted.id;

        debug!("Created client: {} with id {:?}", client.name, client.id);
        Ok(())
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<Client>> {
        let rows: Vec<Client> = self.select(CLIENTS_TABLE, &Self::id_filter(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_client_status(&self, client_id: Uuid, status: ClientStatus) -> Result<()> {
        let updated = self
            .update(
                CLIENTS_TABLE,
                &Self::id_filter(client_id),
                json!({ "status": status }),
            )
            .await?;
        if updated.is_empty() {
            return Err(SyncError::NotFound(format!("client {}", client_id)));
        }
        Ok(())
    }

    async fn mark_client_executed(&self, client_id: Uuid, date: NaiveDate) -> Result<()> {
        let updated = self
            .update(
                CLIENTS_TABLE,
                &Self::id_filter(client_id),
                json!({ "status": ClientStatus::Executed, "letter_executed": date }),
            )
            .await?;
        if updated.is_empty() {
            return Err(SyncError::NotFound(format!("client {}", client_id)));
        }
        Ok(())
    }

    async fn create_letter(&self, letter: &mut EngagementLetter) -> Result<()> {
        let inserted: EngagementLetter = self
            .insert(
                LETTERS_TABLE,
                json!({
                    "client_id": letter.client_id,
                    "matter_type": letter.matter_type,
                    "provider_document_id": letter.provider_document_id,
                    "signature_status": letter.signature_status,
                    "approval_status": letter.approval_status,
                    "stored_artifact_path": letter.stored_artifact_path,
                    "created_at": letter.created_at,
                }),
            )
            .await?;
        letter.id = inserted.id;

        debug!("Created letter {:?} for client {}", letter.id, letter.client_id);
        Ok(())
    }

    async fn find_letter(&self, id: Uuid) -> Result<Option<EngagementLetter>> {
        let rows: Vec<EngagementLetter> =
            self.select(LETTERS_TABLE, &Self::id_filter(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_letter_by_provider_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<EngagementLetter>> {
        let rows: Vec<EngagementLetter> = self
            .select(
                LETTERS_TABLE,
                &[("provider_document_id", format!("eq.{}", document_id))],
            )
            .await?;

        if rows.len() > 1 {
            warn!(
                "Provider document {} maps to {} letters; refusing to pick one",
                document_id,
                rows.len()
            );
            return Ok(None);
        }
        Ok(rows.into_iter().next())
    }

    async fn set_provider_document_id(&self, letter_id: Uuid, document_id: &str) -> Result<()> {
        // The is.null filter makes this a compare-and-set: a concurrent
        // submit that already linked a document leaves nothing to update.
        let updated = self
            .update(
                LETTERS_TABLE,
                &[
                    ("id", format!("eq.{}", letter_id)),
                    ("provider_document_id", "is.null".to_string()),
                ],
                json!({ "provider_document_id": document_id }),
            )
            .await?;
        if !updated.is_empty() {
            return Ok(());
        }

        match self.find_letter(letter_id).await? {
            Some(letter) if letter.provider_document_id.is_some() => {
                Err(SyncError::Validation(format!(
                    "letter {} already has a provider document",
                    letter_id
                )))
            }
            Some(_) => Err(SyncError::Storage {
                message: format!("conditional update on letter {} matched nothing", letter_id),
            }),
            None => Err(SyncError::NotFound(format!("letter {}", letter_id))),
        }
    }

    async fn update_signature_status(
        &self,
        letter_id: Uuid,
        status: SignatureStatus,
    ) -> Result<()> {
        let updated = self
            .update(
                LETTERS_TABLE,
                &Self::id_filter(letter_id),
                json!({ "signature_status": status }),
            )
            .await?;
        if updated.is_empty() {
            return Err(SyncError::NotFound(format!("letter {}", letter_id)));
        }
        Ok(())
    }

    async fn update_approval_status(
        &self,
        letter_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<()> {
        let updated = self
            .update(
                LETTERS_TABLE,
                &Self::id_filter(letter_id),
                json!({ "approval_status": status }),
            )
            .await?;
        if updated.is_empty() {
            return Err(SyncError::NotFound(format!("letter {}", letter_id)));
        }
        Ok(())
    }

    async fn record_artifact_path(&self, letter_id: Uuid, path: &str) -> Result<String> {
        let updated = self
            .update(
                LETTERS_TABLE,
                &[
                    ("id", format!("eq.{}", letter_id)),
                    ("stored_artifact_path", "is.null".to_string()),
                ],
                json!({ "stored_artifact_path": path }),
            )
            .await?;
        if !updated.is_empty() {
            return Ok(path.to_string());
        }

        // Zero rows updated: either a concurrent retrieval won, or the
        // letter is gone. The row's current path is the canonical answer.
        match self.find_letter(letter_id).await? {
            Some(letter) => letter.stored_artifact_path.ok_or(SyncError::Storage {
                message: format!("conditional update on letter {} matched nothing", letter_id),
            }),
            None => Err(SyncError::NotFound(format!("letter {}", letter_id))),
        }
    }
}
