use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::error::ApiError;

/// Key used for errors that are not tied to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field name → list of messages, rendered as `{"field": ["message"]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-error shortcut for `return Err(ValidationErrors::single(..).into())`.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("valid email regex");
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+\-]+$").expect("valid username regex");
}

pub const REQUIRED: &str = "This field is required.";

/// Records a "This field is required." error when `value` is `None`.
pub fn require_present<T>(errors: &mut ValidationErrors, field: &str, value: &Option<T>) {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
}

/// Records a "This field may not be blank." error when `value` is empty.
pub fn require_non_blank(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    }
}

/// Records an error when `value` is longer than `max` characters.
pub fn require_max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(value: &str) -> bool {
    USERNAME_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("rating", "Ensure this value is less than or equal to 5.");
        errors.add(NON_FIELD_ERRORS, "Passwords don't match");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "non_field_errors": ["Passwords don't match"],
                "rating": ["Ensure this value is less than or equal to 5."]
            })
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::non_field("nope").into_result().is_err());
    }

    #[test]
    fn test_length_and_blank_helpers() {
        let mut errors = ValidationErrors::new();
        require_non_blank(&mut errors, "name", "   ");
        require_max_length(&mut errors, "name", "abcdef", 5);
        assert_eq!(errors.field("name").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_require_present() {
        let mut errors = ValidationErrors::new();
        require_present::<String>(&mut errors, "email", &None);
        require_present(&mut errors, "name", &Some("x"));
        assert_eq!(errors.field("email"), Some(&[REQUIRED.to_string()][..]));
        assert!(errors.field("name").is_none());
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("guest@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(!is_valid_email("guest@"));
        assert!(!is_valid_email("guest.example.com"));
        assert!(!is_valid_email("guest@example"));
    }

    #[test]
    fn test_username_format() {
        assert!(is_valid_username("john.doe_42"));
        assert!(is_valid_username("a+b@c-d"));
        assert!(!is_valid_username("john doe"));
        assert!(!is_valid_username(""));
    }
}
