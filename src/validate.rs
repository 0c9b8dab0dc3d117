//! Validation capability shared by every persisted type.

use crate::error::ValidationError;

/// Upper bound on name fields when no configuration says otherwise.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 255;

/// A type that can check its own invariants before it reaches storage.
///
/// Each captor variant supplies its own rule through this trait, so adding a
/// variant never requires touching the callers that run the gate.
pub trait Validate {
    /// Returns `Ok(())` if the value may be persisted.
    ///
    /// # Errors
    /// The first invariant the value breaks.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Checks that a trimmed name fits within `max_length` characters.
pub(crate) fn check_name_length(
    field: &str,
    name: &str,
    max_length: usize,
) -> Result<(), ValidationError> {
    if name.trim().chars().count() > max_length {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name_length() {
        assert!(check_name_length("name", "Florange", 8).is_ok());
        let err = check_name_length("name", "Florange", 7).unwrap_err();
        assert!(matches!(err, ValidationError::FieldTooLong { max_length: 7, .. }));
    }

    #[test]
    fn test_check_name_length_ignores_padding() {
        assert!(check_name_length("name", "  ab  ", 2).is_ok());
    }
}
