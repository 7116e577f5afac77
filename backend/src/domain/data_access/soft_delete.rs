//! Record store decorator enforcing the soft-delete policy.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

use super::criteria::{Condition, Criteria, EntityName, ReadOptions, Record};
use super::policy::{
    DELETED_AT, DataAccessCall, OperationKind, SoftDeletePolicy, deleted_at_cleared,
};
use crate::domain::failure::DataLayerError;
use crate::domain::ports::{RecordStore, SoftDeletingStore};

/// Wraps a [`RecordStore`] so that soft-deleted records stay hidden from the
/// default read paths and deletes only stamp `deletedAt`.
///
/// The wrapped store remains reachable through
/// [`SoftDeletingStore::unfiltered`] for administrative paths.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use b2b_api::domain::data_access::SoftDeleteStore;
/// use b2b_api::outbound::persistence::InMemoryRecordStore;
/// use mockable::DefaultClock;
///
/// let store = SoftDeleteStore::new(InMemoryRecordStore::default(), Arc::new(DefaultClock));
/// # let _ = store;
/// ```
pub struct SoftDeleteStore<S> {
    inner: S,
    policy: SoftDeletePolicy,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> SoftDeleteStore<S> {
    /// Wrap `inner` with the default allow-list.
    pub fn new(inner: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            policy: SoftDeletePolicy::default(),
            clock,
        }
    }

    /// Replace the policy, e.g. to extend the allow-list.
    #[must_use]
    pub fn with_policy(mut self, policy: SoftDeletePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn prepare(&self, call: DataAccessCall) -> DataAccessCall {
        let requested = call.operation;
        let rewritten = self.policy.rewrite(call, self.clock.utc());
        if rewritten.operation != requested {
            debug!(
                entity = %rewritten.entity,
                requested = ?requested,
                issued = ?rewritten.operation,
                "soft-delete policy substituted operation"
            );
        }
        rewritten
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for SoftDeleteStore<S> {
    async fn find_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, DataLayerError> {
        let call = self.prepare(
            DataAccessCall::new(OperationKind::FindMany, entity.clone(), criteria.clone())
                .with_options(options.clone()),
        );
        self.inner
            .find_many(&call.entity, &call.criteria, &call.options)
            .await
    }

    async fn find_first(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Option<Record>, DataLayerError> {
        let call = self.prepare(
            DataAccessCall::new(OperationKind::FindFirst, entity.clone(), criteria.clone())
                .with_options(options.clone()),
        );
        self.inner
            .find_first(&call.entity, &call.criteria, &call.options)
            .await
    }

    async fn find_unique(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Option<Record>, DataLayerError> {
        let call = self.prepare(DataAccessCall::new(
            OperationKind::FindUnique,
            entity.clone(),
            criteria.clone(),
        ));
        match call.operation {
            OperationKind::FindUnique => self.inner.find_unique(&call.entity, &call.criteria).await,
            _ => {
                self.inner
                    .find_first(&call.entity, &call.criteria, &call.options)
                    .await
            }
        }
    }

    async fn count(&self, entity: &EntityName, criteria: &Criteria) -> Result<u64, DataLayerError> {
        let call = self.prepare(DataAccessCall::new(
            OperationKind::Count,
            entity.clone(),
            criteria.clone(),
        ));
        self.inner.count(&call.entity, &call.criteria).await
    }

    async fn create(&self, entity: &EntityName, data: Record) -> Result<Record, DataLayerError> {
        self.inner.create(entity, data).await
    }

    async fn update(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<Record, DataLayerError> {
        self.inner.update(entity, criteria, data).await
    }

    async fn update_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<u64, DataLayerError> {
        self.inner.update_many(entity, criteria, data).await
    }

    async fn delete(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Record, DataLayerError> {
        let call = self.prepare(DataAccessCall::new(
            OperationKind::Delete,
            entity.clone(),
            criteria.clone(),
        ));
        match call.operation {
            OperationKind::Update => {
                self.inner
                    .update(&call.entity, &call.criteria, call.payload.unwrap_or_default())
                    .await
            }
            _ => self.inner.delete(&call.entity, &call.criteria).await,
        }
    }

    async fn delete_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError> {
        let call = self.prepare(DataAccessCall::new(
            OperationKind::DeleteMany,
            entity.clone(),
            criteria.clone(),
        ));
        match call.operation {
            OperationKind::UpdateMany => {
                self.inner
                    .update_many(&call.entity, &call.criteria, call.payload.unwrap_or_default())
                    .await
            }
            _ => self.inner.delete_many(&call.entity, &call.criteria).await,
        }
    }
}

#[async_trait]
impl<S: RecordStore> SoftDeletingStore for SoftDeleteStore<S> {
    async fn restore(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError> {
        if !self.policy.applies_to(entity) {
            return Err(DataLayerError::validation(format!(
                "{entity} does not support soft delete"
            )));
        }
        let deleted = criteria.clone().with_condition(DELETED_AT, Condition::NotNull);
        self.inner
            .update_many(entity, &deleted, deleted_at_cleared())
            .await
    }

    fn unfiltered(&self) -> &dyn RecordStore {
        &self.inner
    }
}
