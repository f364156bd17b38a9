//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Field limits
// =============================================================================

/// Username length bounds (inclusive)
pub const MIN_USERNAME_LENGTH: u64 = 3;
pub const MAX_USERNAME_LENGTH: u64 = 30;

/// First/last name length bounds (inclusive)
pub const MIN_NAME_LENGTH: u64 = 2;
pub const MAX_NAME_LENGTH: u64 = 50;

/// Maximum email length
pub const MAX_EMAIL_LENGTH: u64 = 100;

/// Maximum phone and cellphone length
pub const MAX_PHONE_LENGTH: u64 = 20;

/// Minimum phone length when a phone is supplied
pub const MIN_PHONE_LENGTH: usize = 7;

/// Maximum address length
pub const MAX_ADDRESS_LENGTH: u64 = 200;

/// Maximum city, state and country length
pub const MAX_LOCALITY_LENGTH: u64 = 50;

/// Maximum zipcode length
pub const MAX_ZIPCODE_LENGTH: u64 = 10;

/// Age bounds (inclusive)
pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 120;

// =============================================================================
// Gender
// =============================================================================

/// Accepted gender values (compared after lowercasing)
pub const VALID_GENDERS: &[&str] = &["male", "female", "m", "f"];

/// Check if a gender value is valid (case-insensitive)
pub fn is_valid_gender(gender: &str) -> bool {
    VALID_GENDERS.contains(&gender.to_lowercase().as_str())
}

// =============================================================================
// Passwords
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length requirement
pub const MAX_PASSWORD_LENGTH: usize = 100;

// =============================================================================
// Listing
// =============================================================================

/// Default number of users returned by "latest registered"
pub const DEFAULT_LATEST_LIMIT: u64 = 10;

/// Largest "latest registered" limit a caller may request
pub const MAX_LATEST_LIMIT: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 50;

// =============================================================================
// Confirmation
// =============================================================================

/// Answers accepted as a positive confirmation
pub const CONFIRMATION_ANSWERS: &[&str] = &["s", "si", "y", "yes"];
