use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::{Result, SyncError};

type HmacSha256 = Hmac<Sha256>;

/// Checks the provider's HMAC-SHA256 signature over the raw webhook body.
///
/// With a secret configured this is fail-closed: a missing, malformed or
/// mismatched signature rejects the delivery. Without one, every delivery
/// passes and the degraded mode is logged once at startup.
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            warn!("No webhook secret configured; signature verification is disabled");
        }
        Self { secret }
    }

    pub fn verify(&self, body: &[u8], header: Option<&str>) -> Result<()> {
        let secret = match &self.secret {
            Some(s) => s,
            None => return Ok(()),
        };

        let claimed = header.ok_or_else(|| {
            SyncError::Authentication("missing webhook signature header".to_string())
        })?;
        // Some providers prefix the hex digest with the algorithm name
        let claimed = claimed.strip_prefix("sha256=").unwrap_or(claimed);
        let claimed_bytes = hex::decode(claimed).map_err(|_| {
            SyncError::Authentication("malformed webhook signature header".to_string())
        })?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SyncError::Config("invalid webhook secret".to_string()))?;
        mac.update(body);
        // verify_slice is constant-time; never compare digests with ==
        mac.verify_slice(&claimed_bytes)
            .map_err(|_| SyncError::Authentication("webhook signature mismatch".to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let body = br#"{"event_type":"document_signed","document_id":"doc-1"}"#;
        let sig = sign("topsecret", body);

        assert!(verifier.verify(body, Some(&sig)).is_ok());
    }

    #[test]
    fn accepts_an_algorithm_prefixed_signature() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let body = b"payload";
        let sig = format!("sha256={}", sign("topsecret", body));

        assert!(verifier.verify(body, Some(&sig)).is_ok());
    }

    #[test]
    fn rejects_a_tampered_body() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let sig = sign("topsecret", b"original");

        let result = verifier.verify(b"tampered", Some(&sig));
        assert!(matches!(result, Err(SyncError::Authentication(_))));
    }

    #[test]
    fn rejects_a_signature_under_the_wrong_secret() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let sig = sign("othersecret", b"payload");

        let result = verifier.verify(b"payload", Some(&sig));
        assert!(matches!(result, Err(SyncError::Authentication(_))));
    }

    #[test]
    fn rejects_a_missing_header() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));

        let result = verifier.verify(b"payload", None);
        assert!(matches!(result, Err(SyncError::Authentication(_))));
    }

    #[test]
    fn rejects_a_non_hex_header() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));

        let result = verifier.verify(b"payload", Some("not hex at all"));
        assert!(matches!(result, Err(SyncError::Authentication(_))));
    }

    #[test]
    fn passes_everything_without_a_secret() {
        let verifier = SignatureVerifier::new(None);

        assert!(verifier.verify(b"payload", None).is_ok());
        assert!(verifier.verify(b"payload", Some("garbage")).is_ok());
    }
}
