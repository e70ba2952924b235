use uuid::Uuid;

use crate::constants::LETTER_FILE_NAME;

/// Deterministic storage key for a letter's signed artifact. Retrying a
/// retrieval for the same letter always lands on the same object, so repeat
/// webhook deliveries overwrite rather than accumulate.
pub fn artifact_key(client_id: Uuid, letter_id: Uuid) -> String {
    format!("letters/{}/{}/{}", client_id, letter_id, LETTER_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_key_is_stable_across_calls() {
        let client_id = Uuid::parse_str("7f1a3c2e-9b4d-4e5f-8a6b-1c2d3e4f5a6b").unwrap();
        let letter_id = Uuid::parse_str("0a1b2c3d-4e5f-6a7b-8c9d-0e1f2a3b4c5d").unwrap();

        let first = artifact_key(client_id, letter_id);
        let second = artifact_key(client_id, letter_id);

        assert_eq!(first, second);
        assert_eq!(
            first,
            "letters/7f1a3c2e-9b4d-4e5f-8a6b-1c2d3e4f5a6b/0a1b2c3d-4e5f-6a7b-8c9d-0e1f2a3b4c5d/engagement-letter.pdf"
        );
    }

    #[test]
    fn artifact_key_differs_per_letter() {
        let client_id = Uuid::new_v4();
        let a = artifact_key(client_id, Uuid::new_v4());
        let b = artifact_key(client_id, Uuid::new_v4());
        assert_ne!(a, b);
    }
}
