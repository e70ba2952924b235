use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use esign_sync::app::ports::{EsignProvider, Notifier, PrincipalResolver};
use esign_sync::app::reconcile_use_case::ReconcileUseCase;
use esign_sync::app::retrieve_use_case::DocumentRetriever;
use esign_sync::app::submit_use_case::SubmitUseCase;
use esign_sync::domain::{
    ApprovalStatus, Client, ClientStatus, EngagementLetter, Principal, SignatureStatus,
    SignatureSubmission,
};
use esign_sync::server::{create_server, AppContext};
use esign_sync::storage::{CaseStore, InMemoryArtifactStore, InMemoryCaseStore};
use esign_sync::webhook::SignatureVerifier;

const SECRET: &str = "hook-secret";
const SERVICE_TOKEN: &str = "service-key";

struct StubProvider {
    downloads: AtomicUsize,
}

#[async_trait]
impl EsignProvider for StubProvider {
    async fn create_signature_request(
        &self,
        _submission: &SignatureSubmission,
    ) -> esign_sync::error::Result<String> {
        Ok("doc-new".to_string())
    }

    async fn download_completed_document(
        &self,
        _document_id: &str,
    ) -> esign_sync::error::Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(b"%PDF-1.7 signed letter".to_vec())
    }
}

struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn letter_executed(
        &self,
        _client: &Client,
        _matter_type: &str,
        _signed_on: chrono::NaiveDate,
    ) {
    }
}

/// Maps the two test tokens to fixed identities; everything else is invalid.
struct StaticResolver;

#[async_trait]
impl PrincipalResolver for StaticResolver {
    async fn resolve(&self, bearer: &str) -> esign_sync::error::Result<Principal> {
        match bearer {
            "staff-token" => Ok(Principal {
                id: Uuid::new_v4(),
                email: "lena@doylefirm.example".to_string(),
            }),
            "outsider-token" => Ok(Principal {
                id: Uuid::new_v4(),
                email: "sam@elsewhere.example".to_string(),
            }),
            _ => Err(esign_sync::error::SyncError::Authentication(
                "invalid or expired token".to_string(),
            )),
        }
    }
}

struct HttpHarness {
    app: Router,
    store: Arc<InMemoryCaseStore>,
    artifacts: Arc<InMemoryArtifactStore>,
    provider: Arc<StubProvider>,
    client_id: Uuid,
    letter_id: Uuid,
}

async fn harness(status: SignatureStatus, document_id: Option<&str>) -> HttpHarness {
    let store = Arc::new(InMemoryCaseStore::new());
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    let provider = Arc::new(StubProvider {
        downloads: AtomicUsize::new(0),
    });

    let mut client = Client {
        id: None,
        name: "Harriet Doyle".to_string(),
        email: "harriet@client.example".to_string(),
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
        provider_document_id: document_id.map(|s| s.to_string()),
        signature_status: status,
        approval_status: ApprovalStatus::Draft,
        stored_artifact_path: None,
        created_at: Utc::now(),
    };
    store.create_letter(&mut letter).await.unwrap();
    let letter_id = letter.id.unwrap();

    let retriever = Arc::new(DocumentRetriever::new(
        store.clone(),
        artifacts.clone(),
        provider.clone(),
    ));
    let reconciler = ReconcileUseCase::new(store.clone(), retriever.clone(), Arc::new(NullNotifier));
    let submitter = SubmitUseCase::new(store.clone(), provider.clone());

    let context = AppContext {
        verifier: SignatureVerifier::new(Some(SECRET.to_string())),
        reconciler,
        retriever,
        submitter,
        store: store.clone(),
        resolver: Arc::new(StaticResolver),
        org_email_domain: "doylefirm.example".to_string(),
        service_token: Some(SERVICE_TOKEN.to_string()),
    };

    HttpHarness {
        app: create_server(Arc::new(context)),
        store,
        artifacts,
        provider,
        client_id,
        letter_id,
    }
}

fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn signed_webhook(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/esign")
        .header("x-esign-signature", sign(body.as_bytes()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn authed_post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn completion_body(document_id: &str) -> String {
    json!({
        "event_type": "document_completed",
        "document": { "id": document_id }
    })
    .to_string()
}

#[tokio::test]
async fn webhook_rejects_bad_signature_without_touching_state() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/esign")
        .header("x-esign-signature", "sha256=deadbeef")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(completion_body("doc-42")))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert_eq!(letter.signature_status, SignatureStatus::Sent);
    assert_eq!(h.artifacts.upload_count(), 0);
}

#[tokio::test]
async fn webhook_rejects_missing_signature_header() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/esign")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(completion_body("doc-42")))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_completion_updates_letter_and_stores_artifact() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let response = h
        .app
        .clone()
        .oneshot(signed_webhook(completion_body("doc-42")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["ok"], json!(true));
    assert_eq!(ack["status"], json!("completed"));

    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert_eq!(letter.signature_status, SignatureStatus::Completed);
    assert_eq!(letter.approval_status, ApprovalStatus::Executed);
    assert!(letter.stored_artifact_path.is_some());

    let client = h.store.find_client(h.client_id).await.unwrap().unwrap();
    assert_eq!(client.status, ClientStatus::Executed);
    assert_eq!(h.artifacts.upload_count(), 1);
}

#[tokio::test]
async fn webhook_acknowledges_unknown_event_type() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let body = json!({
        "event_type": "document_bounced",
        "document": { "id": "doc-42" }
    })
    .to_string();
    let response = h.app.clone().oneshot(signed_webhook(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["ignored"], json!("unhandled_event_type"));

    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert_eq!(letter.signature_status, SignatureStatus::Sent);
}

#[tokio::test]
async fn webhook_acknowledges_malformed_body() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let response = h
        .app
        .clone()
        .oneshot(signed_webhook("not json at all".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["ignored"], json!("malformed_payload"));
}

#[tokio::test]
async fn webhook_rejects_wrong_method() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/webhooks/esign")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn fetch_requires_a_bearer_token() {
    let h = harness(SignatureStatus::Signed, Some("doc-42")).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/letters/fetch-document")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "letterId": h.letter_id }).to_string()))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fetch_rejects_principals_outside_the_org_domain() {
    let h = harness(SignatureStatus::Signed, Some("doc-42")).await;

    let request = authed_post(
        "/letters/fetch-document",
        "outsider-token",
        json!({ "letterId": h.letter_id }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.provider.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_returns_404_for_unknown_letter() {
    let h = harness(SignatureStatus::Signed, Some("doc-42")).await;

    let request = authed_post(
        "/letters/fetch-document",
        "staff-token",
        json!({ "letterId": Uuid::new_v4() }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fetch_rejects_letters_not_ready_for_staff() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = authed_post(
        "/letters/fetch-document",
        "staff-token",
        json!({ "letterId": h.letter_id }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.provider.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_stores_once_and_reports_already_stored() {
    let h = harness(SignatureStatus::Signed, Some("doc-42")).await;
    let request = || {
        authed_post(
            "/letters/fetch-document",
            "staff-token",
            json!({ "letterId": h.letter_id }),
        )
    };

    let first = h.app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_ack = body_json(first).await;
    assert_eq!(first_ack["ok"], json!(true));
    assert_eq!(first_ack["alreadyStored"], json!(false));
    let path = first_ack["path"].as_str().unwrap().to_string();

    let second = h.app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_ack = body_json(second).await;
    assert_eq!(second_ack["alreadyStored"], json!(true));
    assert_eq!(second_ack["path"], json!(path));

    // The artifact went over the wire exactly once.
    assert_eq!(h.provider.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(h.artifacts.upload_count(), 1);
}

#[tokio::test]
async fn service_token_may_fetch_before_completion() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = authed_post(
        "/letters/fetch-document",
        SERVICE_TOKEN,
        json!({ "letterId": h.letter_id }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.provider.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_rejects_malformed_request_body() {
    let h = harness(SignatureStatus::Signed, Some("doc-42")).await;

    let request = authed_post(
        "/letters/fetch-document",
        "staff-token",
        json!({ "letterId": "not-a-uuid" }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_opens_a_signature_request_and_advances_state() {
    let h = harness(SignatureStatus::Unsent, None).await;

    let request = authed_post(
        "/letters/send",
        "staff-token",
        json!({
            "letterId": h.letter_id,
            "signerName": "Harriet Doyle",
            "signerEmail": "harriet@client.example",
            "title": "Engagement Letter - Estate Planning",
            "message": "Please review and sign.",
            "documentBase64": BASE64.encode(b"%PDF-1.7 draft letter"),
        }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["providerDocumentId"], json!("doc-new"));

    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert_eq!(letter.provider_document_id.as_deref(), Some("doc-new"));
    assert_eq!(letter.signature_status, SignatureStatus::Sent);
    assert_eq!(letter.approval_status, ApprovalStatus::AwaitingExecution);

    let client = h.store.find_client(h.client_id).await.unwrap().unwrap();
    assert_eq!(client.status, ClientStatus::AwaitingSignature);
}

#[tokio::test]
async fn send_rejects_a_letter_that_already_went_out() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = authed_post(
        "/letters/send",
        "staff-token",
        json!({
            "letterId": h.letter_id,
            "signerName": "Harriet Doyle",
            "signerEmail": "harriet@client.example",
            "title": "Engagement Letter - Estate Planning",
            "documentBase64": BASE64.encode(b"%PDF-1.7 draft letter"),
        }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert_eq!(letter.provider_document_id.as_deref(), Some("doc-42"));
}

#[tokio::test]
async fn send_rejects_invalid_base64() {
    let h = harness(SignatureStatus::Unsent, None).await;

    let request = authed_post(
        "/letters/send",
        "staff-token",
        json!({
            "letterId": h.letter_id,
            "signerName": "Harriet Doyle",
            "signerEmail": "harriet@client.example",
            "title": "Engagement Letter - Estate Planning",
            "documentBase64": "%%% not base64 %%%",
        }),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let letter = h.store.find_letter(h.letter_id).await.unwrap().unwrap();
    assert!(letter.provider_document_id.is_none());
}

#[tokio::test]
async fn health_endpoint_reports_service_identity() {
    let h = harness(SignatureStatus::Sent, Some("doc-42")).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("esign-sync"));
}
