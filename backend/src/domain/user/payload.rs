//! Inbound user payloads and their validated forms.
//!
//! Request types keep every member optional so that a missing field is
//! reported as a validation issue alongside any other problem, rather than
//! as a body deserialisation failure.

use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::UserRole;
use super::validation::IssueCollector;
use crate::domain::data_access::{PASSWORD_FIELD, Record};
use crate::domain::failure::SchemaValidationError;

/// Distinguishes an explicit `null` from an absent member.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[schema(example = "john.doe@example.com")]
    pub email: Option<String>,
    /// At least 8 characters with an uppercase letter, a lowercase letter
    /// and a digit.
    #[schema(example = "Password123!", min_length = 8)]
    pub password: Option<String>,
    #[schema(example = "John")]
    pub first_name: Option<String>,
    #[schema(example = "Doe")]
    pub last_name: Option<String>,
    #[schema(example = "https://example.com/avatar.jpg")]
    pub profile_picture: Option<String>,
    /// Defaults to `USER`.
    #[schema(value_type = Option<UserRole>)]
    pub role: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub role: UserRole,
}

impl CreateUserRequest {
    /// Check every field, collecting all issues.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::CreateUserRequest;
    ///
    /// let request = CreateUserRequest {
    ///     email: Some("not-an-email".into()),
    ///     ..CreateUserRequest::default()
    /// };
    /// let err = request.validate().expect_err("invalid payload");
    /// assert!(err.issues().iter().any(|issue| issue.joined_path() == "email"));
    /// ```
    pub fn validate(self) -> Result<NewUser, SchemaValidationError> {
        let mut issues = IssueCollector::default();
        match self.email.as_deref() {
            Some(email) => issues.email("email", email),
            None => issues.required("email"),
        }
        match self.first_name.as_deref() {
            Some(name) => issues.person_name("firstName", "first name", name),
            None => issues.required("firstName"),
        }
        match self.last_name.as_deref() {
            Some(name) => issues.person_name("lastName", "last name", name),
            None => issues.required("lastName"),
        }
        if let Some(url) = self.profile_picture.as_deref() {
            issues.image_url("profilePicture", url);
        }
        match self.password.as_deref() {
            Some(password) => issues.password("password", password),
            None => issues.required("password"),
        }
        let role = match self.role.as_deref() {
            Some(raw) => issues.role("role", raw),
            None => Some(UserRole::default()),
        };
        issues.finish(|| NewUser {
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            profile_picture: self.profile_picture,
            role: role.unwrap_or_default(),
        })
    }
}

impl NewUser {
    /// Storage record carrying `password_hash` in place of the plaintext.
    pub fn into_record(self, password_hash: String) -> Record {
        let mut record = Record::new();
        record.insert("email".into(), json!(self.email));
        record.insert(PASSWORD_FIELD.into(), json!(password_hash));
        record.insert("firstName".into(), json!(self.first_name));
        record.insert("lastName".into(), json!(self.last_name));
        record.insert("profilePicture".into(), json!(self.profile_picture));
        record.insert("role".into(), json!(self.role.as_str()));
        record
    }
}

/// Body of `PATCH /users/{id}`; every member is optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[schema(example = "john.updated@example.com")]
    pub email: Option<String>,
    #[schema(example = "NewPassword123!")]
    pub password: Option<String>,
    #[schema(example = "Johnny")]
    pub first_name: Option<String>,
    #[schema(example = "Smith")]
    pub last_name: Option<String>,
    /// `null` clears the picture; omitting the member leaves it unchanged.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub profile_picture: Option<Option<String>>,
    #[schema(value_type = Option<UserRole>)]
    pub role: Option<String>,
    #[schema(example = true)]
    pub is_active: Option<bool>,
}

/// An update request that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Check every supplied field, collecting all issues.
    pub fn validate(self) -> Result<UserChanges, SchemaValidationError> {
        let mut issues = IssueCollector::default();
        if let Some(email) = self.email.as_deref() {
            issues.email("email", email);
        }
        if let Some(name) = self.first_name.as_deref() {
            issues.person_name("firstName", "first name", name);
        }
        if let Some(name) = self.last_name.as_deref() {
            issues.person_name("lastName", "last name", name);
        }
        if let Some(Some(url)) = self.profile_picture.as_ref() {
            issues.image_url("profilePicture", url);
        }
        if let Some(password) = self.password.as_deref() {
            issues.password("password", password);
        }
        let role = self.role.as_deref().and_then(|raw| issues.role("role", raw));
        issues.finish(|| UserChanges {
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_picture: self.profile_picture,
            role,
            is_active: self.is_active,
        })
    }
}

impl UserChanges {
    /// Storage record holding only the supplied members.
    pub fn into_record(self, password_hash: Option<String>) -> Record {
        let mut record = Record::new();
        let mut set = |field: &str, value: Option<Value>| {
            if let Some(value) = value {
                record.insert(field.to_owned(), value);
            }
        };
        set("email", self.email.map(Value::from));
        set(PASSWORD_FIELD, password_hash.map(Value::from));
        set("firstName", self.first_name.map(Value::from));
        set("lastName", self.last_name.map(Value::from));
        set("profilePicture", self.profile_picture.map(|url| json!(url)));
        set("role", self.role.map(|role| Value::from(role.as_str())));
        set("isActive", self.is_active.map(Value::from));
        record
    }
}
