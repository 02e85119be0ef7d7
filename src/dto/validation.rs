//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_PLAYER_NAME_LEN: usize = 24;

/// Validates that a player name is non-blank, at most 24 characters, and made
/// of printable characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_PLAYER_NAME_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!(
                "Player name must be at most {} characters (got {})",
                MAX_PLAYER_NAME_LEN,
                trimmed.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("player_name_format");
        err.message = Some("Player name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Alice").is_ok());
        assert!(validate_player_name("  Bob  ").is_ok());
        assert!(validate_player_name("Renée").is_ok());
    }

    #[test]
    fn test_validate_player_name_blank() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
    }

    #[test]
    fn test_validate_player_name_too_long() {
        assert!(validate_player_name(&"x".repeat(25)).is_err());
        assert!(validate_player_name(&"x".repeat(24)).is_ok());
    }

    #[test]
    fn test_validate_player_name_control_characters() {
        assert!(validate_player_name("Ali\x07ce").is_err());
        assert!(validate_player_name("Bob\nEve").is_err());
    }
}
