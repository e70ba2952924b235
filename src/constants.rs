/// Wire-level constants shared across the webhook, provider client and
/// artifact store so the names stay consistent across the codebase.

// Header carrying the provider's HMAC signature on webhook deliveries
pub const SIGNATURE_HEADER: &str = "x-esign-signature";

// Provider event types (closed set; see webhook::events for the mapping)
pub const EVENT_DOCUMENT_SENT: &str = "document_sent";
pub const EVENT_DOCUMENT_VIEWED: &str = "document_viewed";
pub const EVENT_DOCUMENT_SIGNED: &str = "document_signed";
pub const EVENT_DOCUMENT_COMPLETED: &str = "document_completed";
pub const EVENT_DOCUMENT_DECLINED: &str = "document_declined";
pub const EVENT_DOCUMENT_EXPIRED: &str = "document_expired";
pub const EVENT_DOCUMENT_REVOKED: &str = "document_revoked";

// Content type of the signed artifact as stored
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// File name the provider sees for the submitted document
pub const LETTER_FILE_NAME: &str = "engagement-letter.pdf";

// Overlay defaults for the signature block (page is 1-based; coordinates are
// PDF points from the top-left, matching the provider's field placement API)
pub const DEFAULT_SIGNATURE_PAGE: u32 = 1;
pub const DEFAULT_SIGNATURE_X: u32 = 72;
pub const DEFAULT_SIGNATURE_Y: u32 = 640;
pub const DEFAULT_PRINTED_NAME_X: u32 = 72;
pub const DEFAULT_PRINTED_NAME_Y: u32 = 704;
pub const DEFAULT_DATE_SIGNED_X: u32 = 360;
pub const DEFAULT_DATE_SIGNED_Y: u32 = 704;
