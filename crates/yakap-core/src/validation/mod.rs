//! Input validation and sanitization.
//!
//! All free-text fields coming from clients pass through here before they
//! are stored or compared.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Input exceeds maximum allowed length.
    #[error("Input exceeds maximum length ({max} bytes, got {actual})")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Input was empty after sanitization.
    #[error("Input is empty")]
    Empty,
}

/// Size limits per input type.
pub mod limits {
    /// Maximum length for a person's full name.
    pub const MAX_FULLNAME_LENGTH: usize = 256;

    /// Maximum length for a street address.
    pub const MAX_ADDRESS_LENGTH: usize = 512;

    /// Maximum length for a username.
    pub const MAX_USERNAME_LENGTH: usize = 64;

    /// Maximum config file size (1MB).
    pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
}

/// Validate and sanitize a free-text field.
///
/// Performs:
/// 1. Length check (prevent memory exhaustion)
/// 2. Strip null bytes and control chars (except newlines/tabs)
/// 3. Unicode normalization (NFKC - prevent homograph confusion)
///
/// # Errors
///
/// Returns `ValidationError::TooLong` if input exceeds `max_len` and
/// `ValidationError::Empty` if nothing survives sanitization.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, ValidationError> {
    if input.len() > max_len {
        return Err(ValidationError::TooLong {
            max: max_len,
            actual: input.len(),
        });
    }

    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let normalized: String = sanitized.nfkc().collect();

    if normalized.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    Ok(normalized.trim().to_string())
}
