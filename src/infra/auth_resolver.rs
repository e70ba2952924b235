use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::ports::PrincipalResolver;
use crate::config::SupabaseConfig;
use crate::domain::Principal;
use crate::error::{Result, SyncError};

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
}

/// Resolves staff bearer tokens against Supabase Auth.
pub struct SupabaseAuthResolver {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseAuthResolver {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl PrincipalResolver for SupabaseAuthResolver {
    async fn resolve(&self, bearer: &str) -> Result<Principal> {
        let endpoint = format!("{}/auth/v1/user", self.config.url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(bearer)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SyncError::Authentication(
                "invalid or expired token".to_string(),
            ));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Upstream {
                message: format!("auth lookup failed: {} - {}", status, detail),
            });
        }

        let user: AuthUser = response.json().await?;
        let email = user.email.ok_or_else(|| {
            SyncError::Authorization("principal has no email address".to_string())
        })?;
        Ok(Principal { id: user.id, email })
    }
}

/// Stands in when no identity provider is configured. Every staff call is
/// rejected; only the service token (checked before resolution) gets through.
pub struct RejectAllResolver;

#[async_trait]
impl PrincipalResolver for RejectAllResolver {
    async fn resolve(&self, _bearer: &str) -> Result<Principal> {
        Err(SyncError::Authentication(
            "no identity provider configured".to_string(),
        ))
    }
}
