//! PostgreSQL-backed [`RecordStore`] for the `User` entity.
//!
//! Criteria arrive as field-keyed conditions over camelCase record fields.
//! Each condition is compiled into a boxed Diesel predicate against the
//! matching `users` column; values are decoded into the column's Rust type
//! first, so a wrong type or an unknown field is a validation failure
//! rather than a database round trip.
//!
//! Writes resolve the matching primary keys inside a transaction and then
//! act on those ids. Single-record writes (`update`, `delete`) take the
//! first match, as the in-memory store does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::domain::DataLayerError;
use crate::domain::data_access::{
    Condition, Criteria, EntityName, OrderBy, ReadOptions, Record, SortDirection,
};
use crate::domain::ports::RecordStore;

use super::diesel_error_mapping::map_diesel_error;
use super::models::{NewUserRow, UserChangeset, UserRow, UserWrite};
use super::pool::DbPool;
use super::schema::users;

/// Dynamically built `WHERE` fragment over the users table.
type UserFilter = Box<dyn BoxableExpression<users::table, Pg, SqlType = Nullable<Bool>>>;

type BoxedUsers = users::BoxedQuery<'static, Pg>;

/// Fields that identify exactly one user.
const UNIQUE_FIELDS: [&str; 2] = ["id", "email"];

fn boxed<E>(expression: E) -> UserFilter
where
    E: BoxableExpression<users::table, Pg, SqlType = Nullable<Bool>> + 'static,
{
    Box::new(expression)
}

fn unknown_field(field: &str) -> DataLayerError {
    DataLayerError::validation(format!("Unknown field `{field}` for type User"))
}

fn invalid_value(field: &str, expected: &str, value: &Value) -> DataLayerError {
    DataLayerError::validation(format!(
        "Invalid value for argument `{field}`: expected {expected}, got {value}"
    ))
}

fn decode_text(field: &str, value: &Value) -> Result<String, DataLayerError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid_value(field, "a string", value))
}

fn decode_uuid(field: &str, value: &Value) -> Result<Uuid, DataLayerError> {
    value
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| invalid_value(field, "a UUID", value))
}

fn decode_bool(field: &str, value: &Value) -> Result<bool, DataLayerError> {
    value
        .as_bool()
        .ok_or_else(|| invalid_value(field, "a boolean", value))
}

fn decode_datetime(field: &str, value: &Value) -> Result<DateTime<Utc>, DataLayerError> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| invalid_value(field, "an RFC 3339 timestamp", value))
}

fn decode_all<T>(
    field: &str,
    values: &[Value],
    decode: fn(&str, &Value) -> Result<T, DataLayerError>,
) -> Result<Vec<T>, DataLayerError> {
    values.iter().map(|value| decode(field, value)).collect()
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn like_literal(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Predicates shared by every column kind.
macro_rules! scalar_predicate {
    ($column:expr, $decode:path, $field:expr, $condition:expr) => {
        match $condition {
            Condition::Equals(Value::Null) | Condition::IsNull => {
                Ok(boxed($column.is_null().nullable()))
            }
            Condition::NotNull => Ok(boxed($column.is_not_null().nullable())),
            Condition::Equals(value) => Ok(boxed($column.eq($decode($field, value)?).nullable())),
            Condition::NotEquals(value) => Ok(boxed(
                $column
                    .is_distinct_from($decode($field, value)?)
                    .nullable(),
            )),
            Condition::In(values) => Ok(boxed(
                $column.eq_any(decode_all($field, values, $decode)?).nullable(),
            )),
            Condition::Range { gte, lte } => {
                let lower = gte.as_ref().map(|v| $decode($field, v)).transpose()?;
                let upper = lte.as_ref().map(|v| $decode($field, v)).transpose()?;
                Ok(match (lower, upper) {
                    (Some(low), Some(high)) => boxed(
                        $column
                            .ge(low)
                            .nullable()
                            .and($column.le(high).nullable()),
                    ),
                    (Some(low), None) => boxed($column.ge(low).nullable()),
                    (None, Some(high)) => boxed($column.le(high).nullable()),
                    (None, None) => boxed($column.is_not_null().nullable()),
                })
            }
            Condition::Contains(_) | Condition::StartsWith(_) => Err(DataLayerError::validation(
                format!("`{}` does not support text matching", $field),
            )),
        }
    };
}

/// Predicates for text columns, adding case-insensitive matching.
macro_rules! text_predicate {
    ($column:expr, $field:expr, $condition:expr) => {
        match $condition {
            Condition::Contains(needle) => Ok(boxed(
                $column
                    .ilike(format!("%{}%", like_literal(needle)))
                    .nullable(),
            )),
            Condition::StartsWith(prefix) => Ok(boxed(
                $column
                    .ilike(format!("{}%", like_literal(prefix)))
                    .nullable(),
            )),
            other => scalar_predicate!($column, decode_text, $field, other),
        }
    };
}

/// Compile one field condition.
fn predicate(field: &str, condition: &Condition) -> Result<UserFilter, DataLayerError> {
    match field {
        "id" => scalar_predicate!(users::id, decode_uuid, field, condition),
        "email" => text_predicate!(users::email, field, condition),
        "password" => text_predicate!(users::password, field, condition),
        "firstName" => text_predicate!(users::first_name, field, condition),
        "lastName" => text_predicate!(users::last_name, field, condition),
        "profilePicture" => text_predicate!(users::profile_picture, field, condition),
        "role" => text_predicate!(users::role, field, condition),
        "isActive" => scalar_predicate!(users::is_active, decode_bool, field, condition),
        "emailVerifiedAt" => {
            scalar_predicate!(users::email_verified_at, decode_datetime, field, condition)
        }
        "createdAt" => scalar_predicate!(users::created_at, decode_datetime, field, condition),
        "updatedAt" => scalar_predicate!(users::updated_at, decode_datetime, field, condition),
        "deletedAt" => scalar_predicate!(users::deleted_at, decode_datetime, field, condition),
        other => Err(unknown_field(other)),
    }
}

/// Compile criteria into a single predicate; `None` means no constraint.
fn user_filter(criteria: &Criteria) -> Result<Option<UserFilter>, DataLayerError> {
    let all = criteria
        .conditions()
        .map(|(field, condition)| predicate(field, condition))
        .collect::<Result<Vec<_>, _>>()?;
    let any = criteria
        .alternatives()
        .iter()
        .map(|(field, condition)| predicate(field, condition))
        .collect::<Result<Vec<_>, _>>()?;

    let all = all
        .into_iter()
        .reduce(|acc, next| boxed(acc.and(next)));
    let any = any
        .into_iter()
        .reduce(|acc, next| boxed(acc.or(next)));

    Ok(match (all, any) {
        (Some(all), Some(any)) => Some(boxed(all.and(any))),
        (all, any) => all.or(any),
    })
}

macro_rules! order_column {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Asc => $query.then_order_by($column.asc()),
            SortDirection::Desc => $query.then_order_by($column.desc()),
        }
    };
}

fn ordered(query: BoxedUsers, order: &OrderBy) -> Result<BoxedUsers, DataLayerError> {
    let direction = order.direction;
    Ok(match order.field.as_str() {
        "id" => order_column!(query, users::id, direction),
        "email" => order_column!(query, users::email, direction),
        "firstName" => order_column!(query, users::first_name, direction),
        "lastName" => order_column!(query, users::last_name, direction),
        "profilePicture" => order_column!(query, users::profile_picture, direction),
        "role" => order_column!(query, users::role, direction),
        "isActive" => order_column!(query, users::is_active, direction),
        "emailVerifiedAt" => order_column!(query, users::email_verified_at, direction),
        "createdAt" => order_column!(query, users::created_at, direction),
        "updatedAt" => order_column!(query, users::updated_at, direction),
        "deletedAt" => order_column!(query, users::deleted_at, direction),
        other => return Err(unknown_field(other)),
    })
}

fn window(value: Option<u64>, name: &str) -> Result<Option<i64>, DataLayerError> {
    value
        .map(i64::try_from)
        .transpose()
        .map_err(|_| DataLayerError::validation(format!("`{name}` is out of range")))
}

/// Build the `SELECT` for a read.
fn select_users(criteria: &Criteria, options: &ReadOptions) -> Result<BoxedUsers, DataLayerError> {
    let mut query = users::table.into_boxed();
    if let Some(filter) = user_filter(criteria)? {
        query = query.filter(filter);
    }
    for order in &options.order_by {
        query = ordered(query, order)?;
    }
    if let Some(skip) = window(options.skip, "skip")? {
        query = query.offset(skip);
    }
    if let Some(take) = window(options.take, "take")? {
        query = query.limit(take);
    }
    Ok(query)
}

fn ensure_user(entity: &EntityName) -> Result<(), DataLayerError> {
    if *entity == EntityName::USER {
        Ok(())
    } else {
        Err(DataLayerError::validation(format!(
            "Unknown model `{entity}`"
        )))
    }
}

fn ensure_unique(criteria: &Criteria) -> Result<(), DataLayerError> {
    if UNIQUE_FIELDS
        .iter()
        .any(|field| criteria.condition(field).is_some())
    {
        Ok(())
    } else {
        Err(DataLayerError::validation(format!(
            "findUnique on User needs a condition on one of: {}",
            UNIQUE_FIELDS.join(", ")
        )))
    }
}

/// Ids of the rows matching `criteria`.
async fn matching_ids(
    conn: &mut AsyncPgConnection,
    criteria: &Criteria,
    limit: Option<i64>,
) -> Result<Vec<Uuid>, DataLayerError> {
    let mut query = users::table.select(users::id).into_boxed();
    if let Some(filter) = user_filter(criteria)? {
        query = query.filter(filter);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.load(conn).await.map_err(map_diesel_error)
}

/// Diesel-backed record store for users.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselUserStore {
    /// Create a store over `pool`; `clock` stamps `updatedAt` on writes.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl RecordStore for DieselUserStore {
    async fn find_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, DataLayerError> {
        ensure_user(entity)?;
        let query = select_users(criteria, options)?;
        let mut conn = self.pool.get().await?;
        let rows: Vec<UserRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn find_first(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Option<Record>, DataLayerError> {
        let first = ReadOptions {
            take: Some(1),
            ..options.clone()
        };
        let rows = self.find_many(entity, criteria, &first).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_unique(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Option<Record>, DataLayerError> {
        ensure_user(entity)?;
        ensure_unique(criteria)?;
        self.find_first(entity, criteria, &ReadOptions::default())
            .await
    }

    async fn count(&self, entity: &EntityName, criteria: &Criteria) -> Result<u64, DataLayerError> {
        ensure_user(entity)?;
        let mut query = users::table.select(diesel::dsl::count_star()).into_boxed();
        if let Some(filter) = user_filter(criteria)? {
            query = query.filter(filter);
        }
        let mut conn = self.pool.get().await?;
        let total: i64 = query.get_result(&mut conn).await.map_err(map_diesel_error)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn create(&self, entity: &EntityName, data: Record) -> Result<Record, DataLayerError> {
        ensure_user(entity)?;
        let row = NewUserRow::from(UserWrite::from_record(data)?);
        let mut conn = self.pool.get().await?;
        let created: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(user_id = %created.id, "user row inserted");
        Ok(Record::from(created))
    }

    async fn update(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<Record, DataLayerError> {
        ensure_user(entity)?;
        let changes = UserChangeset::new(UserWrite::from_record(data)?, self.clock.utc())?;
        let criteria = criteria.clone();
        let mut conn = self.pool.get().await?;
        let updated: UserRow = conn
            .transaction::<_, DataLayerError, _>(|conn| {
                async move {
                    let Some(id) = matching_ids(conn, &criteria, Some(1))
                        .await?
                        .into_iter()
                        .next()
                    else {
                        return Err(DataLayerError::record_not_found(
                            "Record to update not found.",
                        ));
                    };
                    diesel::update(users::table.find(id))
                        .set(&changes)
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(map_diesel_error)
                }
                .scope_boxed()
            })
            .await?;
        Ok(Record::from(updated))
    }

    async fn update_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<u64, DataLayerError> {
        ensure_user(entity)?;
        let changes = UserChangeset::new(UserWrite::from_record(data)?, self.clock.utc())?;
        let criteria = criteria.clone();
        let mut conn = self.pool.get().await?;
        let changed = conn
            .transaction::<_, DataLayerError, _>(|conn| {
                async move {
                    let ids = matching_ids(conn, &criteria, None).await?;
                    if ids.is_empty() {
                        return Ok(0);
                    }
                    diesel::update(users::table.filter(users::id.eq_any(ids)))
                        .set(&changes)
                        .execute(conn)
                        .await
                        .map_err(map_diesel_error)
                }
                .scope_boxed()
            })
            .await?;
        Ok(changed as u64)
    }

    async fn delete(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Record, DataLayerError> {
        ensure_user(entity)?;
        let criteria = criteria.clone();
        let mut conn = self.pool.get().await?;
        let removed: UserRow = conn
            .transaction::<_, DataLayerError, _>(|conn| {
                async move {
                    let Some(id) = matching_ids(conn, &criteria, Some(1))
                        .await?
                        .into_iter()
                        .next()
                    else {
                        return Err(DataLayerError::record_not_found(
                            "Record to delete does not exist.",
                        ));
                    };
                    diesel::delete(users::table.find(id))
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(map_diesel_error)
                }
                .scope_boxed()
            })
            .await?;
        debug!(user_id = %removed.id, "user row deleted");
        Ok(Record::from(removed))
    }

    async fn delete_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError> {
        ensure_user(entity)?;
        let criteria = criteria.clone();
        let mut conn = self.pool.get().await?;
        let removed = conn
            .transaction::<_, DataLayerError, _>(|conn| {
                async move {
                    let ids = matching_ids(conn, &criteria, None).await?;
                    if ids.is_empty() {
                        return Ok(0);
                    }
                    diesel::delete(users::table.filter(users::id.eq_any(ids)))
                        .execute(conn)
                        .await
                        .map_err(map_diesel_error)
                }
                .scope_boxed()
            })
            .await?;
        Ok(removed as u64)
    }
}
