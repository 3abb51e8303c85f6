//! Field validation.
//!
//! Every validator runs before any storage access and returns the
//! normalized value on success:
//! - usernames are trimmed
//! - emails are trimmed and lower-case-folded
//! - required text fields are trimmed

mod validation_proptest;

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DomainError, DomainResult};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const EMAIL_MAX_LEN: usize = 254;

/// Characters other than digits that satisfy the password's second class.
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // local@label(.label)+ with RFC 5321 atext in the local part and
        // LDH labels in the domain.
        Regex::new(
            r"^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)+$",
        )
        .expect("email pattern is valid")
    })
}

/// Validates a username and returns it trimmed.
///
/// Rules: 3-20 characters from `[a-zA-Z0-9_]`, no leading or trailing
/// underscore, no leading digit.
pub fn validate_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim();
    let invalid =
        |message: &str| DomainError::validation("username", format!("Invalid username: {message}"));

    if username.is_empty() {
        return Err(invalid("username is required"));
    }
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(invalid("must be at least 3 characters long"));
    }
    if len > USERNAME_MAX_LEN {
        return Err(invalid("must be no more than 20 characters long"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid("can only contain letters, numbers, and underscores"));
    }
    if username.starts_with('_') || username.ends_with('_') {
        return Err(invalid("cannot start or end with an underscore"));
    }
    if username.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("cannot start with a number"));
    }
    Ok(username.to_string())
}

/// Validates password strength.
///
/// Rules: 6-128 characters, at least one ASCII letter, and at least one
/// digit or one of [`PASSWORD_SPECIAL_CHARS`].
pub fn validate_password(password: &str) -> DomainResult<()> {
    let invalid =
        |message: &str| DomainError::validation("password", format!("Invalid password: {message}"));

    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(invalid("must be at least 6 characters long"));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(invalid("must be no more than 128 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("must contain at least one letter"));
    }
    if !password
        .chars()
        .any(|c| c.is_ascii_digit() || PASSWORD_SPECIAL_CHARS.contains(c))
    {
        return Err(invalid("must contain at least one number or special character"));
    }
    Ok(())
}

/// Validates an email address and returns it trimmed and lower-case-folded.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let invalid =
        |message: &str| DomainError::validation("email", format!("Invalid email format: {message}"));

    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(invalid("email is required"));
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(invalid("address is too long"));
    }
    if !email.contains('@') {
        return Err(invalid("the address must contain an @ sign"));
    }
    if !email_regex().is_match(&email) {
        return Err(invalid("the address is not valid"));
    }
    Ok(email)
}

/// Requires a text field to be present and not blank. Returns it trimmed.
pub fn require_text(
    field: &'static str,
    value: Option<&str>,
    message: &str,
) -> DomainResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DomainError::validation(field, message)),
    }
}
