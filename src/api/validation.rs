//! Input validation for API requests: size limits on free-text fields,
//! checked before anything reaches the engine.

/// Validate an account name
pub fn validate_account_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

/// Validate a book name
pub fn validate_book_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Book name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Book name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

/// Validate a transaction note
pub fn validate_note(note: &str) -> Result<(), String> {
    if note.len() > 500 {
        return Err("Note is too long (max 500 characters)".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_be_present_and_bounded() {
        assert!(validate_account_name("alice").is_ok());
        assert!(validate_account_name("  ").is_err());
        assert!(validate_account_name(&"x".repeat(101)).is_err());

        assert!(validate_book_name("Main").is_ok());
        assert!(validate_book_name("").is_err());
    }

    #[test]
    fn notes_may_be_empty_but_not_huge() {
        assert!(validate_note("").is_ok());
        assert!(validate_note(&"x".repeat(500)).is_ok());
        assert!(validate_note(&"x".repeat(501)).is_err());
    }
}
