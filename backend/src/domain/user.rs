//! User data model.
//!
//! Users are stored as [`Record`]s keyed by camelCase field names; [`User`]
//! is the typed view handed to the HTTP layer. The stored password hash is
//! stripped by [`SensitiveFieldStore`](crate::domain::data_access::SensitiveFieldStore)
//! long before a record is turned into a [`User`], so the type has no field
//! for it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::data_access::Record;
use super::failure::{DataLayerError, IssueCode, SchemaValidationError, ValidationIssue};

mod payload;
mod validation;

pub use payload::{CreateUserRequest, NewUser, UpdateUserRequest, UserChanges};

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a path or body value, reporting failures against `id`.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::UserId;
    ///
    /// assert!(UserId::parse("3fa85f64-5717-4562-b3fc-2c963f66afa6").is_ok());
    /// assert!(UserId::parse("42").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, SchemaValidationError> {
        Uuid::parse_str(raw.trim()).map(Self).map_err(|_| {
            SchemaValidationError::new(vec![ValidationIssue::field(
                "id",
                IssueCode::InvalidString,
                "Invalid uuid",
            )])
        })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Access level granted to a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 2] = [Self::Admin, Self::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no [`UserRole`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

/// Application user as returned to clients.
///
/// ## Invariants
/// - `deleted_at` is `None` for every user returned by the default read
///   paths; only restore responses and administrative reads may carry a
///   timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: UserId,
    #[schema(example = "john.doe@example.com")]
    pub email: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "https://example.com/avatar.jpg")]
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Decode a user from a stored record.
    ///
    /// Extra fields, such as a password hash that escaped stripping, are
    /// ignored rather than surfaced.
    pub fn from_record(record: Record) -> Result<Self, DataLayerError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|err| DataLayerError::unknown(format!("malformed user record: {err}")))
    }
}

#[cfg(test)]
mod tests;
