use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_DATE_SIGNED_X, DEFAULT_DATE_SIGNED_Y, DEFAULT_PRINTED_NAME_X, DEFAULT_PRINTED_NAME_Y,
    DEFAULT_SIGNATURE_PAGE, DEFAULT_SIGNATURE_X, DEFAULT_SIGNATURE_Y,
};
use crate::error::{Result, SyncError};

/// Everything the service needs, resolved once at startup and passed down
/// explicitly. Components never read the environment themselves.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub org_email_domain: String,
    pub esign: EsignConfig,
    pub supabase: Option<SupabaseConfig>,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone)]
pub struct EsignConfig {
    pub api_base: String,
    pub api_key: String,
    /// Absent secret means webhook signatures are not checked. Startup logs
    /// a warning and the verifier lets every delivery through.
    pub webhook_secret: Option<String>,
    pub overlay: SignatureOverlay,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub slack_webhook_url: Option<String>,
}

/// Where the provider should place the signing fields on the letter.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureOverlay {
    #[serde(default = "default_page")]
    pub page: u32,
    pub signature: FieldPosition,
    pub printed_name: FieldPosition,
    pub date_signed: FieldPosition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldPosition {
    pub x: u32,
    pub y: u32,
}

fn default_page() -> u32 {
    DEFAULT_SIGNATURE_PAGE
}

impl Default for SignatureOverlay {
    fn default() -> Self {
        SignatureOverlay {
            page: DEFAULT_SIGNATURE_PAGE,
            signature: FieldPosition {
                x: DEFAULT_SIGNATURE_X,
                y: DEFAULT_SIGNATURE_Y,
            },
            printed_name: FieldPosition {
                x: DEFAULT_PRINTED_NAME_X,
                y: DEFAULT_PRINTED_NAME_Y,
            },
            date_signed: FieldPosition {
                x: DEFAULT_DATE_SIGNED_X,
                y: DEFAULT_DATE_SIGNED_Y,
            },
        }
    }
}

impl SignatureOverlay {
    /// Reads field positions from `fields.toml` (or FIELDS_CONFIG) when the
    /// file exists; otherwise the built-in defaults apply.
    pub fn load() -> Result<Self> {
        let path = std::env::var("FIELDS_CONFIG").unwrap_or_else(|_| "fields.toml".to_string());
        if !Path::new(&path).exists() {
            return Ok(SignatureOverlay::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            SyncError::Config(format!("Failed to read fields config '{}': {}", path, e))
        })?;
        let overlay: SignatureOverlay = toml::from_str(&content)?;
        Ok(overlay)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| SyncError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            Err(_) => 8080,
        };

        let esign = EsignConfig {
            api_base: required("ESIGN_API_BASE")?,
            api_key: required("ESIGN_API_KEY")?,
            webhook_secret: optional("ESIGN_WEBHOOK_SECRET"),
            overlay: SignatureOverlay::load()?,
        };

        let supabase = match optional("SUPABASE_URL") {
            Some(url) => Some(SupabaseConfig {
                url,
                service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
                bucket: optional("SUPABASE_BUCKET")
                    .unwrap_or_else(|| "engagement-letters".to_string()),
            }),
            None => None,
        };

        Ok(AppConfig {
            port,
            org_email_domain: required("ORG_EMAIL_DOMAIN")?,
            esign,
            supabase,
            notify: NotifyConfig {
                slack_webhook_url: optional("SLACK_WEBHOOK_URL"),
            },
        })
    }

    /// Bearer value that marks a request as coming from a trusted internal
    /// service rather than a staff member.
    pub fn service_token(&self) -> Option<&str> {
        self.supabase
            .as_ref()
            .map(|s| s.service_role_key.as_str())
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| SyncError::Config(format!("Missing required environment variable {}", name)))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
