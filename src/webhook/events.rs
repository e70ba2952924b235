use crate::constants::{
    EVENT_DOCUMENT_COMPLETED, EVENT_DOCUMENT_DECLINED, EVENT_DOCUMENT_EXPIRED,
    EVENT_DOCUMENT_REVOKED, EVENT_DOCUMENT_SENT, EVENT_DOCUMENT_SIGNED, EVENT_DOCUMENT_VIEWED,
};
use crate::domain::SignatureStatus;

/// The provider event types we act on. Anything outside this set is
/// acknowledged and dropped; new event types must be added here explicitly
/// before the service reacts to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Sent,
    Viewed,
    Signed,
    Completed,
    Declined,
    Expired,
    Revoked,
}

impl ProviderEvent {
    /// Exact string match; no casefolding, no prefixes.
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            EVENT_DOCUMENT_SENT => Some(ProviderEvent::Sent),
            EVENT_DOCUMENT_VIEWED => Some(ProviderEvent::Viewed),
            EVENT_DOCUMENT_SIGNED => Some(ProviderEvent::Signed),
            EVENT_DOCUMENT_COMPLETED => Some(ProviderEvent::Completed),
            EVENT_DOCUMENT_DECLINED => Some(ProviderEvent::Declined),
            EVENT_DOCUMENT_EXPIRED => Some(ProviderEvent::Expired),
            EVENT_DOCUMENT_REVOKED => Some(ProviderEvent::Revoked),
            _ => None,
        }
    }

    /// The letter status this event drives the store to.
    pub fn status(&self) -> SignatureStatus {
        match self {
            ProviderEvent::Sent => SignatureStatus::Sent,
            ProviderEvent::Viewed => SignatureStatus::Viewed,
            ProviderEvent::Signed => SignatureStatus::Signed,
            ProviderEvent::Completed => SignatureStatus::Completed,
            ProviderEvent::Declined => SignatureStatus::Declined,
            ProviderEvent::Expired => SignatureStatus::Expired,
            ProviderEvent::Revoked => SignatureStatus::Revoked,
        }
    }

    /// Completion is the only event with side effects beyond the status write.
    pub fn is_completion(&self) -> bool {
        matches!(self, ProviderEvent::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_known_event_to_its_status() {
        let cases = [
            ("document_sent", SignatureStatus::Sent),
            ("document_viewed", SignatureStatus::Viewed),
            ("document_signed", SignatureStatus::Signed),
            ("document_completed", SignatureStatus::Completed),
            ("document_declined", SignatureStatus::Declined),
            ("document_expired", SignatureStatus::Expired),
            ("document_revoked", SignatureStatus::Revoked),
        ];

        for (raw, expected) in cases {
            let event = ProviderEvent::parse(raw).unwrap();
            assert_eq!(event.status(), expected, "case {}", raw);
        }
    }

    #[test]
    fn drops_unknown_event_types() {
        assert!(ProviderEvent::parse("document_bounced").is_none());
        assert!(ProviderEvent::parse("").is_none());
        assert!(ProviderEvent::parse("signed").is_none());
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(ProviderEvent::parse("DOCUMENT_SIGNED").is_none());
        assert!(ProviderEvent::parse("Document_Signed").is_none());
    }

    #[test]
    fn only_completed_carries_side_effects() {
        assert!(ProviderEvent::Completed.is_completion());
        assert!(!ProviderEvent::Signed.is_completion());
        assert!(!ProviderEvent::Declined.is_completion());
    }
}
