//! In-memory [`RecordStore`] used by tests and by deployments started
//! without a database URL.
//!
//! Rows live in insertion order per entity behind a single mutex. The store
//! mimics the constraints the `users` table enforces in PostgreSQL: unique
//! `id` and `email`, required columns, and server-side defaults for ids and
//! timestamps. Errors use the same [`DataLayerError`] codes the Diesel
//! adapter produces, so the error envelope looks identical either way.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::SecondsFormat;
use mockable::{Clock, DefaultClock};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::data_access::{Criteria, DELETED_AT, EntityName, ReadOptions, Record};
use crate::domain::failure::DataLayerError;
use crate::domain::ports::RecordStore;

/// Columns that must be non-null on a user row.
const USER_REQUIRED: [&str; 4] = ["email", "password", "firstName", "lastName"];

/// Columns that hold a unique index, per entity.
fn unique_fields(entity: &EntityName) -> &'static [&'static str] {
    if *entity == EntityName::USER {
        &["id", "email"]
    } else {
        &["id"]
    }
}

/// Thread-safe record store holding everything in process memory.
///
/// # Examples
/// ```
/// use b2b_api::domain::data_access::{Criteria, EntityName};
/// use b2b_api::domain::ports::RecordStore;
/// use b2b_api::outbound::persistence::InMemoryRecordStore;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let store = InMemoryRecordStore::default();
/// let total = store.count(&EntityName::USER, &Criteria::new()).await;
/// assert_eq!(total, Ok(0));
/// # });
/// ```
pub struct InMemoryRecordStore {
    tables: Mutex<BTreeMap<EntityName, Vec<Record>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryRecordStore {
    /// Empty store stamping timestamps from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<EntityName, Vec<Record>>>, DataLayerError> {
        self.tables
            .lock()
            .map_err(|_| DataLayerError::unknown("in-memory store lock poisoned"))
    }

    fn now(&self) -> Value {
        json!(self.clock.utc().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Fill the column defaults PostgreSQL would apply on insert.
    fn with_defaults(&self, entity: &EntityName, mut data: Record) -> Record {
        let now = self.now();
        data.entry("id")
            .or_insert_with(|| json!(Uuid::new_v4().to_string()));
        data.entry("createdAt").or_insert_with(|| now.clone());
        data.entry("updatedAt").or_insert(now);
        data.entry(DELETED_AT).or_insert(Value::Null);
        if *entity == EntityName::USER {
            data.entry("role").or_insert_with(|| json!("USER"));
            data.entry("isActive").or_insert(Value::Bool(true));
            data.entry("profilePicture").or_insert(Value::Null);
            data.entry("emailVerifiedAt").or_insert(Value::Null);
        }
        data
    }
}

fn check_required(entity: &EntityName, record: &Record) -> Result<(), DataLayerError> {
    if *entity != EntityName::USER {
        return Ok(());
    }
    match USER_REQUIRED
        .iter()
        .find(|field| record.get(**field).is_none_or(Value::is_null))
    {
        Some(field) => Err(DataLayerError::null_violation(
            format!("Null constraint violation on the fields: (`{field}`)"),
            Some(*field),
        )),
        None => Ok(()),
    }
}

/// Reject `candidate` if it collides with any row other than `skip`.
fn check_unique(
    entity: &EntityName,
    rows: &[Record],
    candidate: &Record,
    skip: Option<usize>,
) -> Result<(), DataLayerError> {
    for field in unique_fields(entity) {
        let Some(value) = candidate.get(*field).filter(|v| !v.is_null()) else {
            continue;
        };
        let collides = rows
            .iter()
            .enumerate()
            .any(|(index, row)| Some(index) != skip && row.get(*field) == Some(value));
        if collides {
            return Err(DataLayerError::unique_violation(
                format!("Unique constraint failed on the fields: (`{field}`)"),
                [*field],
            ));
        }
    }
    Ok(())
}

fn merged(row: &Record, data: &Record) -> Record {
    let mut next = row.clone();
    next.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    next
}

fn matching(rows: &[Record], criteria: &Criteria) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| criteria.matches(row))
        .map(|(index, _)| index)
        .collect()
}

fn has_unique_condition(entity: &EntityName, criteria: &Criteria) -> bool {
    unique_fields(entity)
        .iter()
        .any(|field| criteria.condition(field).is_some())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, DataLayerError> {
        let tables = self.lock()?;
        let rows = tables
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| criteria.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(options.apply(rows))
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
        if !has_unique_condition(entity, criteria) {
            return Err(DataLayerError::validation(format!(
                "findUnique on {entity} needs a condition on one of: {}",
                unique_fields(entity).join(", ")
            )));
        }
        self.find_first(entity, criteria, &ReadOptions::default())
            .await
    }

    async fn count(&self, entity: &EntityName, criteria: &Criteria) -> Result<u64, DataLayerError> {
        let tables = self.lock()?;
        let total = tables
            .get(entity)
            .map_or(0, |rows| matching(rows, criteria).len());
        Ok(total as u64)
    }

    async fn create(&self, entity: &EntityName, data: Record) -> Result<Record, DataLayerError> {
        let record = self.with_defaults(entity, data);
        check_required(entity, &record)?;
        let mut tables = self.lock()?;
        let rows = tables.entry(entity.clone()).or_default();
        check_unique(entity, rows, &record, None)?;
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        mut data: Record,
    ) -> Result<Record, DataLayerError> {
        data.entry("updatedAt").or_insert_with(|| self.now());
        let mut tables = self.lock()?;
        let rows = tables.entry(entity.clone()).or_default();
        let Some(index) = matching(rows, criteria).into_iter().next() else {
            return Err(DataLayerError::record_not_found(
                "Record to update not found.",
            ));
        };
        let next = merged(&rows[index], &data);
        check_required(entity, &next)?;
        check_unique(entity, rows, &next, Some(index))?;
        rows[index] = next.clone();
        Ok(next)
    }

    async fn update_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        mut data: Record,
    ) -> Result<u64, DataLayerError> {
        data.entry("updatedAt").or_insert_with(|| self.now());
        let mut tables = self.lock()?;
        let rows = tables.entry(entity.clone()).or_default();
        let targets = matching(rows, criteria);
        let mut staged = rows.clone();
        for index in &targets {
            let next = merged(&staged[*index], &data);
            check_required(entity, &next)?;
            check_unique(entity, &staged, &next, Some(*index))?;
            staged[*index] = next;
        }
        *rows = staged;
        Ok(targets.len() as u64)
    }

    async fn delete(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Record, DataLayerError> {
        let mut tables = self.lock()?;
        let rows = tables.entry(entity.clone()).or_default();
        match matching(rows, criteria).into_iter().next() {
            Some(index) => Ok(rows.remove(index)),
            None => Err(DataLayerError::record_not_found(
                "Record to delete does not exist.",
            )),
        }
    }

    async fn delete_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError> {
        let mut tables = self.lock()?;
        let Some(rows) = tables.get_mut(entity) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !criteria.matches(row));
        Ok((before - rows.len()) as u64)
    }
}
