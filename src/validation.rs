//! Field validation shared by the forms and the config loader.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// A validation error attached to a named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

// Same shape the browser's email validator accepts: a dotted local part,
// then one or more hostname labels. The overall length limits are checked
// separately since the regex crate has no lookahead.
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > 254 {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if local.len() <= 64 => EMAIL.is_match(email),
        _ => false,
    }
}

/// Dates are entered as `YYYY-MM-DD`
pub fn is_valid_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// Collects field errors for one form submission.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<ValidationError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.errors
                .push(ValidationError::new(field, "This field is required"));
        }
        self
    }

    /// Only applies to non-empty values; pair with `required` when needed.
    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let len = value.chars().count();
        if len > 0 && len < min {
            self.errors.push(ValidationError::new(
                field,
                format!("Must be at least {} characters", min),
            ));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && !is_valid_email(value) {
            self.errors
                .push(ValidationError::new(field, "Must be a valid email address"));
        }
        self
    }

    pub fn date(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && !is_valid_date(value) {
            self.errors
                .push(ValidationError::new(field, "Must be a date (YYYY-MM-DD)"));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(is_valid_email("user@localhost"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("invalid.email.com"));
        assert!(!is_valid_email("@."));
        assert!(!is_valid_email("user@-example.com"));
        assert!(!is_valid_email("user@@example.com"));
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(!is_valid_email(&long_local));
    }

    #[test]
    fn test_dates() {
        assert!(is_valid_date("1990-04-12"));
        assert!(!is_valid_date("1990-13-01"));
        assert!(!is_valid_date("12/04/1990"));
    }

    #[test]
    fn test_checks_collect_all_errors() {
        let errors = Checks::new()
            .required("Username", "")
            .min_len("Password", "short", 8)
            .email("Email", "nope")
            .finish()
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "Username");
        assert!(errors[1].message.contains("at least 8"));
        assert_eq!(format!("{}", errors[2]), "[Email]: Must be a valid email address");
    }

    #[test]
    fn test_min_len_counts_characters() {
        assert!(Checks::new().min_len("Password", "pässwörd", 8).finish().is_ok());
        assert!(Checks::new().min_len("Password", "", 8).finish().is_ok());
    }
}
