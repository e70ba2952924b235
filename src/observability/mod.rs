// Observability: metrics and monitoring

pub mod metrics;

// Re-export main functions for ease of use
pub use metrics::init;
