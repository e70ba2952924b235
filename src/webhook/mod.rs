// Webhook ingestion: signature verification and event classification

pub mod events;
pub mod verifier;

pub use events::ProviderEvent;
pub use verifier::SignatureVerifier;
