//! Field validation routines.
//!
//! Each routine takes raw caller input and returns the sanitized value, or a
//! validation error carrying a human-readable message. The repository never
//! calls these; they run in the caller layer before any repository operation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{
    is_valid_gender, CONFIRMATION_ANSWERS, MAX_AGE, MAX_PASSWORD_LENGTH, MIN_AGE,
    MIN_NAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_PHONE_LENGTH,
};
use crate::error::{DomainError, DomainResult};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Parse a strictly positive integer.
pub fn validate_positive_int(input: &str, field: &str) -> DomainResult<i64> {
    let value = parse_int(input, field)?;
    if value <= 0 {
        return Err(DomainError::validation(format!("{} must be a positive number", field)));
    }
    Ok(value)
}

/// Parse an integer within `[min, max]`.
pub fn validate_int_range(input: &str, field: &str, min: i64, max: i64) -> DomainResult<i64> {
    let value = parse_int(input, field)?;
    validate_range(value, field, min, max)
}

fn parse_int(input: &str, field: &str) -> DomainResult<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| DomainError::validation(format!("{} must be a valid number", field)))
}

/// Check an already-parsed integer against `[min, max]`.
pub fn validate_range(value: i64, field: &str, min: i64, max: i64) -> DomainResult<i64> {
    if value < min || value > max {
        return Err(DomainError::validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(value)
}

/// Check an already-parsed age.
pub fn validate_age(age: i32) -> DomainResult<i32> {
    validate_range(age.into(), "age", MIN_AGE.into(), MAX_AGE.into())?;
    Ok(age)
}

/// Require non-blank text of at least two characters; returns it trimmed.
pub fn validate_required_text(input: &str, field: &str) -> DomainResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    if (trimmed.chars().count() as u64) < MIN_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "{} must be at least {} characters",
            field, MIN_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Require a well-formed email; returns it trimmed.
pub fn validate_email(input: &str) -> DomainResult<String> {
    let email = input.trim();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email.to_string())
}

/// Require one of the accepted genders; returns it lowercased.
pub fn validate_gender(input: &str) -> DomainResult<String> {
    let gender = input.trim().to_lowercase();
    if gender.is_empty() {
        return Err(DomainError::validation("gender is required"));
    }
    if !is_valid_gender(&gender) {
        return Err(DomainError::validation(
            "gender must be 'male', 'female', 'm' or 'f'",
        ));
    }
    Ok(gender)
}

/// Phones are optional: blank input yields an empty string.
pub fn validate_phone(input: &str) -> DomainResult<String> {
    let phone = input.trim();
    if phone.is_empty() {
        return Ok(String::new());
    }
    if phone.chars().count() < MIN_PHONE_LENGTH {
        return Err(DomainError::validation(format!(
            "phone must have at least {} digits",
            MIN_PHONE_LENGTH
        )));
    }
    Ok(phone.to_string())
}

/// Accept "s", "si", "y" or "yes" in any case.
pub fn validate_confirmation(input: &str) -> DomainResult<()> {
    let answer = input.trim().to_lowercase();
    if answer.is_empty() {
        return Err(DomainError::validation("the action must be confirmed"));
    }
    if !CONFIRMATION_ANSWERS.contains(&answer.as_str()) {
        return Err(DomainError::validation("invalid confirmation, answer 'y' to confirm"));
    }
    Ok(())
}

/// Check a new password and its confirmation.
pub fn validate_password(password: &str, confirm_password: &str) -> DomainResult<()> {
    if password.trim().is_empty() {
        return Err(DomainError::validation("password is required"));
    }
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(DomainError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(DomainError::validation(format!(
            "password cannot exceed {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    if password != confirm_password {
        return Err(DomainError::validation("passwords do not match"));
    }
    Ok(())
}
