// Identifiers accepted by the backend: 1-36 chars of [a-zA-Z0-9._-], not starting with a special char.
use crate::error::{CoreError, Result};

pub const MAX_ID_LEN: usize = 36;

/// Generate a fresh unique identifier for users, files and documents.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn validate_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return Err(CoreError::invalid_id(id));
    };
    if id.len() > MAX_ID_LEN || !first.is_ascii_alphanumeric() {
        return Err(CoreError::invalid_id(id));
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) {
        Ok(())
    } else {
        Err(CoreError::invalid_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(validate_id(&a).is_ok());
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("_leading").is_err());
        assert!(validate_id("has space").is_err());
        assert!(validate_id(&"a".repeat(37)).is_err());
        assert!(validate_id("user.01-a_b").is_ok());
    }
}
