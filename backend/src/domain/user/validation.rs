//! Field rules shared by the create and update payloads.
//!
//! Every rule reports into an [`IssueCollector`] instead of returning early,
//! so a client sees all problems with a payload in one response.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::domain::failure::{IssueCode, SchemaValidationError, ValidationIssue};
use crate::domain::user::UserRole;

pub(super) const NAME_MAX: usize = 50;
pub(super) const EMAIL_MAX: usize = 255;
pub(super) const PASSWORD_MIN: usize = 8;
pub(super) const PASSWORD_MAX: usize = 100;

pub(super) const PASSWORD_MESSAGE: &str =
    "Password must contain at least one uppercase letter, one lowercase letter, and one number";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn name_regex() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑ\s]+$")
            .unwrap_or_else(|error| panic!("name regex failed to compile: {error}"))
    })
}

/// Accumulates issues across all fields of one payload.
#[derive(Debug, Default)]
pub(super) struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub(super) fn push(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
        self.issues.push(ValidationIssue::field(field, code, message));
    }

    pub(super) fn required(&mut self, field: &str) {
        self.push(field, IssueCode::InvalidType, "Required");
    }

    /// Yield `value` if no issue was recorded.
    pub(super) fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, SchemaValidationError> {
        if self.issues.is_empty() {
            Ok(value())
        } else {
            Err(SchemaValidationError::new(self.issues))
        }
    }

    pub(super) fn email(&mut self, field: &str, value: &str) {
        if !email_regex().is_match(value) {
            self.push(field, IssueCode::InvalidString, "Invalid email");
        }
        if value.chars().count() > EMAIL_MAX {
            self.push(field, IssueCode::TooBig, "email is too long");
        }
    }

    /// Letters and spaces, 1..=50 characters. `label` is the human name
    /// used in messages, e.g. `first name`.
    pub(super) fn person_name(&mut self, field: &str, label: &str, value: &str) {
        let length = value.chars().count();
        if length == 0 {
            self.push(field, IssueCode::TooSmall, format!("{label} is required"));
        }
        if length > NAME_MAX {
            self.push(field, IssueCode::TooBig, format!("{label} is too long"));
        }
        if !name_regex().is_match(value) {
            self.push(
                field,
                IssueCode::InvalidString,
                format!("{label} can only contain letters"),
            );
        }
    }

    pub(super) fn password(&mut self, field: &str, value: &str) {
        let length = value.chars().count();
        if length < PASSWORD_MIN {
            self.push(
                field,
                IssueCode::TooSmall,
                "Password must be at least 8 characters long",
            );
        }
        if length > PASSWORD_MAX {
            self.push(field, IssueCode::TooBig, "Password is too long");
        }
        let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            self.push(field, IssueCode::InvalidString, PASSWORD_MESSAGE);
        }
    }

    pub(super) fn image_url(&mut self, field: &str, value: &str) {
        let accepted = Url::parse(value)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
        if !accepted {
            self.push(field, IssueCode::InvalidString, "Invalid image URL");
        }
    }

    pub(super) fn role(&mut self, field: &str, value: &str) -> Option<UserRole> {
        match value.parse::<UserRole>() {
            Ok(role) => Some(role),
            Err(_) => {
                let expected = UserRole::ALL
                    .iter()
                    .map(|role| format!("'{role}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                self.push(
                    field,
                    IssueCode::InvalidEnumValue,
                    format!("Invalid enum value. Expected {expected}, received '{value}'"),
                );
                None
            }
        }
    }
}
