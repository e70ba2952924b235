//! Metrics for the e-signature reconciliation service.
//!
//! This module provides a straightforward API for recording metrics using
//! the standard Prometheus naming conventions.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::PrometheusHandle;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Webhook metrics
    WebhookReceived,
    WebhookSignatureRejected,
    WebhookIgnored,
    WebhookReconciled,
    WebhookProcessingDuration,

    // Retriever metrics
    RetrieverDownloadsSuccess,
    RetrieverDownloadsError,
    RetrieverAlreadyStored,
    RetrieverArtifactBytes,

    // Provider client metrics
    ProviderRequestsSuccess,
    ProviderRequestsError,
    ProviderRequestDuration,

    // Send-for-signature metrics
    SendSuccess,
    SendError,

    // Notification metrics
    NotifySuccess,
    NotifyError,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Webhook metrics
            MetricName::WebhookReceived => "esync_webhook_received_total",
            MetricName::WebhookSignatureRejected => "esync_webhook_signature_rejected_total",
            MetricName::WebhookIgnored => "esync_webhook_ignored_total",
            MetricName::WebhookReconciled => "esync_webhook_reconciled_total",
            MetricName::WebhookProcessingDuration => "esync_webhook_processing_duration_seconds",

            // Retriever metrics
            MetricName::RetrieverDownloadsSuccess => "esync_retriever_downloads_success_total",
            MetricName::RetrieverDownloadsError => "esync_retriever_downloads_error_total",
            MetricName::RetrieverAlreadyStored => "esync_retriever_already_stored_total",
            MetricName::RetrieverArtifactBytes => "esync_retriever_artifact_bytes",

            // Provider client metrics
            MetricName::ProviderRequestsSuccess => "esync_provider_requests_success_total",
            MetricName::ProviderRequestsError => "esync_provider_requests_error_total",
            MetricName::ProviderRequestDuration => "esync_provider_request_duration_seconds",

            // Send-for-signature metrics
            MetricName::SendSuccess => "esync_send_success_total",
            MetricName::SendError => "esync_send_error_total",

            // Notification metrics
            MetricName::NotifySuccess => "esync_notify_success_total",
            MetricName::NotifyError => "esync_notify_error_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system and keep the recorder handle for rendering
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE.set(handle).ok();
    Ok(())
}

/// Render the current metric registry for the /metrics endpoint
pub fn get_metrics_handle() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Webhook Metrics
// ============================================================================

pub mod webhook {
    use super::MetricName;

    /// Record a delivery hitting the endpoint, before any verification
    pub fn received() {
        ::metrics::counter!(MetricName::WebhookReceived.as_str()).increment(1);
    }

    /// Record a delivery rejected for a bad or missing signature
    pub fn signature_rejected() {
        ::metrics::counter!(MetricName::WebhookSignatureRejected.as_str()).increment(1);
    }

    /// Record a delivery acknowledged without touching any letter
    pub fn ignored(reason: &str) {
        ::metrics::counter!(
            MetricName::WebhookIgnored.as_str(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    /// Record a delivery that updated a letter
    pub fn reconciled(status: &str) {
        ::metrics::counter!(
            MetricName::WebhookReconciled.as_str(),
            "status" => status.to_string()
        )
        .increment(1);
    }

    /// Record end-to-end processing duration
    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::WebhookProcessingDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Retriever Metrics
// ============================================================================

pub mod retriever {
    use super::MetricName;

    /// Record a completed document downloaded and stored
    pub fn download_success() {
        ::metrics::counter!(MetricName::RetrieverDownloadsSuccess.as_str()).increment(1);
    }

    /// Record a failed download or store write
    pub fn download_error() {
        ::metrics::counter!(MetricName::RetrieverDownloadsError.as_str()).increment(1);
    }

    /// Record a retrieval short-circuited by an existing artifact
    pub fn already_stored() {
        ::metrics::counter!(MetricName::RetrieverAlreadyStored.as_str()).increment(1);
    }

    /// Record artifact size
    pub fn artifact_bytes(bytes: usize) {
        ::metrics::histogram!(MetricName::RetrieverArtifactBytes.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Provider Client Metrics
// ============================================================================

pub mod provider {
    use super::MetricName;

    /// Record a successful provider API call
    pub fn request_success(operation: &str) {
        ::metrics::counter!(
            MetricName::ProviderRequestsSuccess.as_str(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    /// Record a failed provider API call
    pub fn request_error(operation: &str) {
        ::metrics::counter!(
            MetricName::ProviderRequestsError.as_str(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    /// Record provider request duration
    pub fn request_duration(secs: f64) {
        ::metrics::histogram!(MetricName::ProviderRequestDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Send-for-signature Metrics
// ============================================================================

pub mod send {
    use super::MetricName;

    pub fn success() {
        ::metrics::counter!(MetricName::SendSuccess.as_str()).increment(1);
    }

    pub fn error() {
        ::metrics::counter!(MetricName::SendError.as_str()).increment(1);
    }
}

// ============================================================================
// Notification Metrics
// ============================================================================

pub mod notify {
    use super::MetricName;

    pub fn success() {
        ::metrics::counter!(MetricName::NotifySuccess.as_str()).increment(1);
    }

    pub fn error() {
        ::metrics::counter!(MetricName::NotifyError.as_str()).increment(1);
    }
}
