// Adapters for the external collaborators: the e-signature provider,
// Supabase persistence and storage, auth, and the notification channel.

pub mod artifact_fs;
pub mod artifact_supabase;
pub mod auth_resolver;
pub mod esign_client;
pub mod slack_notifier;
pub mod supabase_store;
