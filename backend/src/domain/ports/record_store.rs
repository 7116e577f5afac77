//! Narrow persistence port over JSON records.
//!
//! Services read and write entities through [`RecordStore`]. The verbs
//! mirror the persistence client's model API: the soft-delete and
//! sensitive-field decorators wrap this trait, and adapters (Diesel,
//! in-memory) implement it.

use async_trait::async_trait;

use crate::domain::data_access::{Criteria, EntityName, ReadOptions, Record};
use crate::domain::failure::DataLayerError;

/// Record-level persistence operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records matching `criteria`, ordered and windowed by `options`.
    async fn find_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, DataLayerError>;

    /// First record matching `criteria` in `options` order.
    async fn find_first(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Option<Record>, DataLayerError>;

    /// Record identified by a unique field.
    async fn find_unique(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Option<Record>, DataLayerError>;

    /// Number of records matching `criteria`.
    async fn count(&self, entity: &EntityName, criteria: &Criteria) -> Result<u64, DataLayerError>;

    /// Insert a record and return it as stored.
    async fn create(&self, entity: &EntityName, data: Record) -> Result<Record, DataLayerError>;

    /// Update the record matching `criteria`.
    ///
    /// Fails with `P2025` when nothing matches.
    async fn update(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<Record, DataLayerError>;

    /// Update every matching record, returning how many changed.
    async fn update_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<u64, DataLayerError>;

    /// Remove the record matching `criteria` and return it.
    ///
    /// Fails with `P2025` when nothing matches.
    async fn delete(&self, entity: &EntityName, criteria: &Criteria)
    -> Result<Record, DataLayerError>;

    /// Remove every matching record, returning how many were removed.
    async fn delete_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError>;
}

/// Record store whose default paths hide soft-deleted records.
#[async_trait]
pub trait SoftDeletingStore: RecordStore {
    /// Clear `deletedAt` on matching records, returning how many changed.
    async fn restore(&self, entity: &EntityName, criteria: &Criteria)
    -> Result<u64, DataLayerError>;

    /// The store beneath the soft-delete policy, for administrative hard
    /// deletes and audits.
    fn unfiltered(&self) -> &dyn RecordStore;
}
