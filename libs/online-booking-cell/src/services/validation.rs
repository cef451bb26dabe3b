// =====================================================================================
// FIELD VALIDATION & NORMALIZATION
// =====================================================================================

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const MIN_DNI_DIGITS: usize = 7;
pub const MIN_PHONE_DIGITS: usize = 11;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("name contains digits")]
    NameContainsDigits,

    #[error("national id has {digits} digits, at least {} required", MIN_DNI_DIGITS)]
    DniTooShort { digits: usize },

    #[error("phone has {digits} digits, at least {} required", MIN_PHONE_DIGITS)]
    PhoneTooShort { digits: usize },

    #[error("email is not in local@domain.tld form")]
    InvalidEmail,
}

/// Rejects names with digits and capitalizes the first letter of every word.
pub fn validate_name(input: &str) -> Result<String, ValidationIssue> {
    if input.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationIssue::NameContainsDigits);
    }

    Ok(input
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" "))
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn normalize_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_dni(input: &str) -> Result<String, ValidationIssue> {
    let digits = normalize_digits(input);
    if digits.len() < MIN_DNI_DIGITS {
        return Err(ValidationIssue::DniTooShort { digits: digits.len() });
    }
    Ok(digits)
}

pub fn validate_phone(input: &str) -> Result<String, ValidationIssue> {
    let digits = normalize_digits(input);
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationIssue::PhoneTooShort { digits: digits.len() });
    }
    Ok(digits)
}

pub fn validate_email(input: &str) -> Result<String, ValidationIssue> {
    let email = input.trim();
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationIssue::InvalidEmail);
    }
    Ok(email.to_string())
}
