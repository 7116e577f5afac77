//! Internal Diesel row structs for the `users` table.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Records cross the port as camelCase JSON
//! objects; this module converts between those and typed rows.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::DataLayerError;
use crate::domain::data_access::Record;

use super::schema::users;

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

fn timestamp(value: DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl From<UserRow> for Record {
    fn from(row: UserRow) -> Self {
        let value = json!({
            "id": row.id.to_string(),
            "email": row.email,
            "password": row.password,
            "firstName": row.first_name,
            "lastName": row.last_name,
            "profilePicture": row.profile_picture,
            "role": row.role,
            "isActive": row.is_active,
            "emailVerifiedAt": row.email_verified_at.map(timestamp),
            "createdAt": timestamp(row.created_at),
            "updatedAt": timestamp(row.updated_at),
            "deletedAt": row.deleted_at.map(timestamp),
        });
        match value {
            Value::Object(record) => record,
            _ => Self::new(),
        }
    }
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent member.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Write payload decoded from a record. Unknown members are rejected the
/// way the database client rejects unknown arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct UserWrite {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub profile_picture: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub email_verified_at: Option<Option<DateTime<Utc>>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

impl UserWrite {
    pub fn from_record(record: Record) -> Result<Self, DataLayerError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|err| DataLayerError::validation(format!("invalid user data: {err}")))
    }
}

/// Insertable struct for creating user rows. `None` columns take their
/// database default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<UserWrite> for NewUserRow {
    fn from(write: UserWrite) -> Self {
        Self {
            id: write.id,
            email: write.email,
            password: write.password,
            first_name: write.first_name,
            last_name: write.last_name,
            profile_picture: write.profile_picture.flatten(),
            role: write.role,
            is_active: write.is_active,
            email_verified_at: write.email_verified_at.flatten(),
            created_at: write.created_at,
            updated_at: write.updated_at,
            deleted_at: write.deleted_at.flatten(),
        }
    }
}

/// Changeset for updates. Outer `None` leaves a column untouched; for
/// nullable columns `Some(None)` writes NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserChangeset {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub email_verified_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

impl UserChangeset {
    /// Changeset from `write`, stamping `updated_at` with `now` unless the
    /// write sets it.
    pub fn new(write: UserWrite, now: DateTime<Utc>) -> Result<Self, DataLayerError> {
        if write.id.is_some() || write.created_at.is_some() {
            return Err(DataLayerError::validation(
                "id and createdAt cannot be changed",
            ));
        }
        Ok(Self {
            email: write.email,
            password: write.password,
            first_name: write.first_name,
            last_name: write.last_name,
            profile_picture: write.profile_picture,
            role: write.role,
            is_active: write.is_active,
            email_verified_at: write.email_verified_at,
            updated_at: write.updated_at.unwrap_or(now),
            deleted_at: write.deleted_at,
        })
    }
}
