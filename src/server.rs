use crate::app::ports::PrincipalResolver;
use crate::app::reconcile_use_case::{EventOutcome, ReconcileUseCase};
use crate::app::retrieve_use_case::DocumentRetriever;
use crate::app::submit_use_case::{SubmitRequest, SubmitUseCase};
use crate::constants::SIGNATURE_HEADER;
use crate::domain::{InboundEvent, Principal};
use crate::error::SyncError;
use crate::storage::CaseStore;
use crate::webhook::SignatureVerifier;
use axum::{
    body::Bytes,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hyper::Server;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything the handlers need, wired once at startup.
pub struct AppContext {
    pub verifier: SignatureVerifier,
    pub reconciler: ReconcileUseCase,
    pub retriever: Arc<DocumentRetriever>,
    pub submitter: SubmitUseCase,
    pub store: Arc<dyn CaseStore>,
    pub resolver: Arc<dyn PrincipalResolver>,
    pub org_email_domain: String,
    /// Bearer value for trusted internal callers; they skip the staff checks.
    pub service_token: Option<String>,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "esign-sync",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus scrape endpoint
async fn metrics() -> impl IntoResponse {
    match crate::observability::metrics::get_metrics_handle() {
        Some(text) => (StatusCode::OK, text),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not initialized".to_string(),
        ),
    }
}

fn status_for(error: &SyncError) -> StatusCode {
    match error {
        SyncError::Authentication(_) => StatusCode::UNAUTHORIZED,
        SyncError::Authorization(_) => StatusCode::FORBIDDEN,
        SyncError::Validation(_) | SyncError::MissingField(_) | SyncError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        SyncError::NotFound(_) => StatusCode::NOT_FOUND,
        SyncError::Upstream { .. } | SyncError::Http(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &SyncError) -> Response {
    let status = status_for(error);
    (status, Json(json!({ "ok": false, "error": error.to_string() }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

enum Caller {
    Service,
    Staff(Principal),
}

/// Service token short-circuits; everyone else resolves to a principal whose
/// email must sit in the firm's domain.
async fn authorize(context: &AppContext, headers: &HeaderMap) -> Result<Caller, SyncError> {
    let token = bearer_token(headers)
        .ok_or_else(|| SyncError::Authentication("missing bearer token".to_string()))?;

    if context.service_token.as_deref() == Some(token) {
        return Ok(Caller::Service);
    }

    let principal = context.resolver.resolve(token).await?;
    let suffix = format!("@{}", context.org_email_domain);
    if !principal.email.ends_with(&suffix) {
        return Err(SyncError::Authorization(format!(
            "{} is not part of the authorized organization",
            principal.email
        )));
    }
    Ok(Caller::Staff(principal))
}

/// Inbound provider events. Always acknowledges with 200 once the signature
/// checks out; the provider redelivers on anything else, and redelivering a
/// delivery we already understood is pure noise.
async fn esign_webhook(
    Extension(context): Extension<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    crate::observability::metrics::webhook::received();
    let started = Instant::now();

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(e) = context.verifier.verify(&body, signature) {
        crate::observability::metrics::webhook::signature_rejected();
        warn!("Rejected webhook delivery: {}", e);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "invalid signature" })),
        );
    }

    let event: InboundEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            info!("Acknowledging unparseable webhook body: {}", e);
            crate::observability::metrics::webhook::ignored("malformed_payload");
            return (
                StatusCode::OK,
                Json(json!({ "ok": true, "ignored": "malformed_payload" })),
            );
        }
    };

    let ack = match context.reconciler.handle_event(&event).await {
        Ok(EventOutcome::Reconciled { letter_id, status }) => {
            json!({ "ok": true, "letterId": letter_id, "status": status.as_str() })
        }
        Ok(EventOutcome::Ignored { reason }) => json!({ "ok": true, "ignored": reason }),
        Err(e) => {
            // Still ack: the status write is recoverable through the
            // on-demand fetch path, and a 5xx would just trigger redelivery
            // of an event we could not process the first time either.
            error!("Webhook reconciliation failed: {}", e);
            json!({ "ok": true, "ignored": "internal_error" })
        }
    };

    crate::observability::metrics::webhook::duration(started.elapsed().as_secs_f64());
    (StatusCode::OK, Json(ack))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchDocumentRequest {
    letter_id: Uuid,
}

/// Pull-based retrieval for operators and internal services.
async fn fetch_document(
    Extension(context): Extension<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: FetchDocumentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(&SyncError::Validation(format!("invalid request body: {}", e)))
        }
    };

    let caller = match authorize(&context, &headers).await {
        Ok(caller) => caller,
        Err(e) => return error_response(&e),
    };

    let letter = match context.store.find_letter(request.letter_id).await {
        Ok(Some(letter)) => letter,
        Ok(None) => {
            return error_response(&SyncError::NotFound(format!("letter {}", request.letter_id)))
        }
        Err(e) => return error_response(&e),
    };

    if letter.provider_document_id.is_none() {
        return error_response(&SyncError::MissingField(format!(
            "provider_document_id on letter {}",
            request.letter_id
        )));
    }

    // Staff wait until the provider can actually serve the PDF. The service
    // path skips the status gate so a missed completion webhook can be
    // repaired by hand.
    if matches!(caller, Caller::Staff(_)) && !letter.signature_status.signature_available() {
        return error_response(&SyncError::Validation(format!(
            "letter {} is not ready for retrieval (status: {})",
            request.letter_id,
            letter.signature_status.as_str()
        )));
    }

    match context.retriever.retrieve(request.letter_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "path": outcome.path,
                "alreadyStored": outcome.already_stored,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!("On-demand fetch for letter {} failed: {}", request.letter_id, e);
            error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendLetterRequest {
    letter_id: Uuid,
    signer_name: String,
    signer_email: String,
    title: String,
    #[serde(default)]
    message: String,
    document_base64: String,
}

/// Opens a signature request with the provider for a drafted letter.
async fn send_letter(
    Extension(context): Extension<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: SendLetterRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(&SyncError::Validation(format!("invalid request body: {}", e)))
        }
    };

    if let Err(e) = authorize(&context, &headers).await {
        return error_response(&e);
    }

    let pdf_bytes = match BASE64.decode(&request.document_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(&SyncError::Validation(format!(
                "document is not valid base64: {}",
                e
            )))
        }
    };

    let submit = SubmitRequest {
        letter_id: request.letter_id,
        signer_name: request.signer_name,
        signer_email: request.signer_email,
        title: request.title,
        message: request.message,
        pdf_bytes,
    };

    match context.submitter.submit(submit).await {
        Ok(document_id) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "providerDocumentId": document_id })),
        )
            .into_response(),
        Err(e) => {
            warn!("Send for letter {} failed: {}", request.letter_id, e);
            error_response(&e)
        }
    }
}

/// Create the HTTP server with all routes
pub fn create_server(context: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/webhooks/esign", post(esign_webhook))
        .route("/letters/fetch-document", post(fetch_document))
        .route("/letters/send", post(send_letter))
        .layer(Extension(context))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    context: Arc<AppContext>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(context);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("🪝 Webhook:      http://localhost:{port}/webhooks/esign");
    println!("📈 Metrics:      http://localhost:{port}/metrics");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
