use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use esign_sync::app::ports::{ArtifactStore, EsignProvider, Notifier, PrincipalResolver};
use esign_sync::app::reconcile_use_case::ReconcileUseCase;
use esign_sync::app::retrieve_use_case::DocumentRetriever;
use esign_sync::app::submit_use_case::{SubmitRequest, SubmitUseCase};
use esign_sync::config::AppConfig;
use esign_sync::error::SyncError;
use esign_sync::infra::artifact_fs::FsArtifactStore;
use esign_sync::infra::artifact_supabase::SupabaseArtifactStore;
use esign_sync::infra::auth_resolver::{RejectAllResolver, SupabaseAuthResolver};
use esign_sync::infra::esign_client::EsignHttpClient;
use esign_sync::infra::slack_notifier::SlackNotifier;
use esign_sync::infra::supabase_store::SupabaseCaseStore;
use esign_sync::server::{start_server, AppContext};
use esign_sync::storage::{CaseStore, InMemoryCaseStore};
use esign_sync::webhook::SignatureVerifier;
use esign_sync::{logging, observability};

#[derive(Parser)]
#[command(name = "esign_sync")]
#[command(about = "Engagement letter e-signature reconciliation service")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver and staff API
    Serve {
        /// Storage backend to use (supabase, memory)
        #[arg(long, default_value = "supabase")]
        storage: String,
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send a drafted letter out for signature, bypassing HTTP
    Send {
        /// Letter to send
        #[arg(long)]
        letter_id: Uuid,
        /// Path to the letter PDF
        #[arg(long)]
        pdf: PathBuf,
        /// Signer's full name
        #[arg(long)]
        signer_name: String,
        /// Signer's email address
        #[arg(long)]
        signer_email: String,
        /// Document title shown to the signer
        #[arg(long, default_value = "Engagement Letter")]
        title: String,
        /// Message included in the signature request email
        #[arg(long, default_value = "")]
        message: String,
        /// Storage backend to use (supabase, memory)
        #[arg(long, default_value = "supabase")]
        storage: String,
    },
    /// Retrieve and store the executed PDF for one letter, bypassing HTTP
    Fetch {
        /// Letter to retrieve
        #[arg(long)]
        letter_id: Uuid,
        /// Storage backend to use (supabase, memory)
        #[arg(long, default_value = "supabase")]
        storage: String,
    },
}

fn create_stores(
    config: &AppConfig,
    storage: &str,
) -> Result<(Arc<dyn CaseStore>, Arc<dyn ArtifactStore>), SyncError> {
    match storage {
        "supabase" => {
            let supabase = config.supabase.clone().ok_or_else(|| {
                SyncError::Config("SUPABASE_URL is required for supabase storage".to_string())
            })?;
            Ok((
                Arc::new(SupabaseCaseStore::new(supabase.clone())),
                Arc::new(SupabaseArtifactStore::new(supabase)),
            ))
        }
        "memory" => {
            let dir = std::env::var("ARTIFACTS_DIR").unwrap_or_else(|_| "artifacts".to_string());
            Ok((
                Arc::new(InMemoryCaseStore::new()),
                Arc::new(FsArtifactStore::new(dir)),
            ))
        }
        other => Err(SyncError::Config(format!(
            "Unknown storage backend '{}'. Use 'supabase' or 'memory'.",
            other
        ))),
    }
}

fn build_context(config: &AppConfig, storage: &str) -> Result<Arc<AppContext>, SyncError> {
    let (store, artifacts) = create_stores(config, storage)?;

    let provider: Arc<dyn EsignProvider> = Arc::new(EsignHttpClient::new(config.esign.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(SlackNotifier::new(config.notify.clone()));
    let resolver: Arc<dyn PrincipalResolver> = match &config.supabase {
        Some(supabase) => Arc::new(SupabaseAuthResolver::new(supabase.clone())),
        None => {
            warn!("No identity provider configured; staff endpoints will reject all callers");
            Arc::new(RejectAllResolver)
        }
    };

    let retriever = Arc::new(DocumentRetriever::new(
        store.clone(),
        artifacts,
        provider.clone(),
    ));
    let reconciler = ReconcileUseCase::new(store.clone(), retriever.clone(), notifier);
    let submitter = SubmitUseCase::new(store.clone(), provider);

    Ok(Arc::new(AppContext {
        verifier: SignatureVerifier::new(config.esign.webhook_secret.clone()),
        reconciler,
        retriever,
        submitter,
        store,
        resolver,
        org_email_domain: config.org_email_domain.clone(),
        service_token: config.service_token().map(|s| s.to_string()),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    if let Err(e) = observability::init() {
        warn!("Metrics recorder not installed: {}", e);
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { storage, port } => {
            let port = port.unwrap_or(config.port);
            println!("📄 esign-sync starting with {} storage", storage);
            let context = build_context(&config, &storage)?;
            start_server(context, port).await?;
        }
        Commands::Send {
            letter_id,
            pdf,
            signer_name,
            signer_email,
            title,
            message,
            storage,
        } => {
            let context = build_context(&config, &storage)?;
            let pdf_bytes = std::fs::read(&pdf)?;
            println!("📤 Sending letter {} for signature", letter_id);
            match context
                .submitter
                .submit(SubmitRequest {
                    letter_id,
                    signer_name,
                    signer_email,
                    title,
                    message,
                    pdf_bytes,
                })
                .await
            {
                Ok(document_id) => {
                    println!("✅ Signature request opened: provider document {}", document_id);
                }
                Err(e) => {
                    error!("Send failed: {}", e);
                    println!("❌ Send failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Fetch { letter_id, storage } => {
            let context = build_context(&config, &storage)?;
            println!("📥 Fetching executed document for letter {}", letter_id);
            match context.retriever.retrieve(letter_id).await {
                Ok(outcome) => {
                    if outcome.already_stored {
                        println!("✅ Already stored at {}", outcome.path);
                    } else {
                        println!("✅ Stored at {}", outcome.path);
                    }
                }
                Err(e) => {
                    error!("Fetch failed: {}", e);
                    println!("❌ Fetch failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
