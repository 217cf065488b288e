//! # Input Validation
//!
//! Field rules applied before any state changes. Every check returns a
//! message the API can hand straight back to the client.

use domains::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 128;
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const THREAD_CONTENT_MIN: usize = 10;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]+$").unwrap_or_else(|e| panic!("username regex: {e}"))
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

/// Validates a registration username: length bound, restricted alphabet.
pub fn username(value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    if !USERNAME_RE.is_match(value) {
        return Err(AppError::validation(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<()> {
    if !EMAIL_RE.is_match(value) {
        return Err(AppError::validation("Invalid email format"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(AppError::validation(format!(
            "Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}

/// Thread titles are trimmed before the length check.
pub fn thread_title(value: &str) -> Result<()> {
    let len = value.trim().chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(AppError::validation(format!(
            "Title must be between {TITLE_MIN} and {TITLE_MAX} characters"
        )));
    }
    Ok(())
}

pub fn thread_content(value: &str) -> Result<()> {
    if value.trim().chars().count() < THREAD_CONTENT_MIN {
        return Err(AppError::validation(format!(
            "Content must be at least {THREAD_CONTENT_MIN} characters"
        )));
    }
    Ok(())
}

pub fn comment_content(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }
    Ok(())
}

/// Reaction emoji must be present and short enough for the column.
pub fn emoji(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::validation("Emoji is required"));
    }
    if value.chars().count() > 10 {
        return Err(AppError::validation("Emoji too long"));
    }
    Ok(())
}

/// The bare message of a failed check, for collectors that fold several
/// field errors into one response.
pub fn error_message(result: Result<()>) -> Option<String> {
    match result {
        Ok(()) => None,
        Err(AppError::Validation(msg)) => Some(msg),
        Err(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_bounds_and_alphabet() {
        assert!(username("ab").is_err());
        assert!(username(&"a".repeat(51)).is_err());
        assert!(username("has space").is_err());
        assert!(username("has-dash").is_err());
        assert!(username("ok_name_42").is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(email("a@b.co").is_ok());
        assert!(email("no-at-sign").is_err());
        assert!(email("two@@b.co").is_err());
        assert!(email("space in@b.co").is_err());
        assert!(email("a@nodot").is_err());
    }

    #[test]
    fn password_bounds() {
        assert!(password("short").is_err());
        assert!(password("justright").is_ok());
        assert!(password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn title_trims_before_measuring() {
        assert!(thread_title("  ab  ").is_err());
        assert!(thread_title("abc").is_ok());
        assert!(thread_title(&"t".repeat(256)).is_err());
    }

    #[test]
    fn thread_content_minimum() {
        assert!(thread_content("too short").is_err());
        assert!(thread_content("this is long enough").is_ok());
    }

    #[test]
    fn comment_content_rejects_whitespace_only() {
        assert!(comment_content("   ").is_err());
        assert!(comment_content("hi").is_ok());
    }

    #[test]
    fn emoji_required_and_bounded() {
        assert!(emoji("").is_err());
        assert!(emoji("👍").is_ok());
        assert!(emoji(&"👍".repeat(11)).is_err());
    }

    #[test]
    fn error_message_strips_the_variant_prefix() {
        assert_eq!(error_message(Ok(())), None);
        assert_eq!(
            error_message(email("nope")).as_deref(),
            Some("Invalid email format")
        );
    }
}
