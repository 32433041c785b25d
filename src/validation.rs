//! Input validation for identifiers that cross the store and sink boundaries.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_OWNER_ID_LENGTH: usize = 128;

fn channel_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").expect("static regex is valid"))
}

/// Validate that a string is not empty or whitespace-only.
///
/// # Example
/// ```
/// use pantry_watch::validation::validate_not_empty;
///
/// assert!(validate_not_empty("milk", "ingredient_name").is_ok());
/// assert!(validate_not_empty("   ", "ingredient_name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate an inventory owner identifier.
///
/// Owner ids scope every query and update, so they must be non-empty,
/// contain no path separator, and stay within 128 characters.
///
/// # Example
/// ```
/// use pantry_watch::validation::validate_owner_id;
///
/// assert!(validate_owner_id("Yx81kQ0pZ", "owner_id").is_ok());
/// assert!(validate_owner_id("", "owner_id").is_err());
/// assert!(validate_owner_id("users/abc", "owner_id").is_err());
/// ```
pub fn validate_owner_id(value: &str, field_name: &str) -> ValidationResult<()> {
    validate_not_empty(value, field_name)?;

    if value.contains('/') {
        return Err(ValidationError {
            field: field_name.to_string(),
            message: "must not contain '/'".to_string(),
        });
    }

    if value.chars().count() > MAX_OWNER_ID_LENGTH {
        return Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {MAX_OWNER_ID_LENGTH} characters"),
        });
    }

    Ok(())
}

/// Validate a notification channel identifier.
///
/// # Example
/// ```
/// use pantry_watch::validation::validate_channel_id;
///
/// assert!(validate_channel_id("EXPIRATION_REMINDER_CHANNEL", "channel_id").is_ok());
/// assert!(validate_channel_id("with space", "channel_id").is_err());
/// ```
pub fn validate_channel_id(value: &str, field_name: &str) -> ValidationResult<()> {
    if channel_id_regex().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "must be 1-64 characters of [A-Za-z0-9_.-]".to_string(),
        })
    }
}
