//! Result-shaping decorator that strips sensitive fields from records.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::criteria::{Criteria, EntityName, ReadOptions, Record};
use crate::domain::failure::DataLayerError;
use crate::domain::ports::RecordStore;

/// Field never returned for [`EntityName::USER`] records.
pub const PASSWORD_FIELD: &str = "password";

/// Wraps a [`RecordStore`] and removes designated fields from every record
/// it returns, whichever operation produced it.
pub struct SensitiveFieldStore<S> {
    inner: S,
    hidden: BTreeMap<EntityName, Vec<&'static str>>,
}

impl<S: RecordStore> SensitiveFieldStore<S> {
    /// Hide `password` on users.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hidden: BTreeMap::from([(EntityName::USER, vec![PASSWORD_FIELD])]),
        }
    }

    fn strip(&self, entity: &EntityName, mut record: Record) -> Record {
        if let Some(fields) = self.hidden.get(entity) {
            for field in fields {
                record.remove(*field);
            }
        }
        record
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for SensitiveFieldStore<S> {
    async fn find_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, DataLayerError> {
        let records = self.inner.find_many(entity, criteria, options).await?;
        Ok(records
            .into_iter()
            .map(|record| self.strip(entity, record))
            .collect())
    }

    async fn find_first(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        options: &ReadOptions,
    ) -> Result<Option<Record>, DataLayerError> {
        let record = self.inner.find_first(entity, criteria, options).await?;
        Ok(record.map(|record| self.strip(entity, record)))
    }

    async fn find_unique(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<Option<Record>, DataLayerError> {
        let record = self.inner.find_unique(entity, criteria).await?;
        Ok(record.map(|record| self.strip(entity, record)))
    }

    async fn count(&self, entity: &EntityName, criteria: &Criteria) -> Result<u64, DataLayerError> {
        self.inner.count(entity, criteria).await
    }

    async fn create(&self, entity: &EntityName, data: Record) -> Result<Record, DataLayerError> {
        let record = self.inner.create(entity, data).await?;
        Ok(self.strip(entity, record))
    }

    async fn update(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
        data: Record,
    ) -> Result<Record, DataLayerError> {
        let record = self.inner.update(entity, criteria, data).await?;
        Ok(self.strip(entity, record))
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
        let record = self.inner.delete(entity, criteria).await?;
        Ok(self.strip(entity, record))
    }

    async fn delete_many(
        &self,
        entity: &EntityName,
        criteria: &Criteria,
    ) -> Result<u64, DataLayerError> {
        self.inner.delete_many(entity, criteria).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockRecordStore;
    use rstest::rstest;
    use serde_json::json;

    fn stored_user() -> Record {
        json!({
            "id": "b7f0c1de-0000-4000-8000-000000000001",
            "email": "ada@example.com",
            "password": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA",
        })
        .as_object()
        .cloned()
        .expect("object literal")
    }

    #[rstest]
    #[tokio::test]
    async fn every_user_read_path_omits_password() {
        let mut inner = MockRecordStore::new();
        inner
            .expect_find_many()
            .returning(|_, _, _| Ok(vec![stored_user(), stored_user()]));
        inner
            .expect_find_first()
            .returning(|_, _, _| Ok(Some(stored_user())));
        inner
            .expect_find_unique()
            .returning(|_, _| Ok(Some(stored_user())));
        inner.expect_create().returning(|_, _| Ok(stored_user()));
        inner.expect_update().returning(|_, _, _| Ok(stored_user()));
        inner.expect_delete().returning(|_, _| Ok(stored_user()));
        let store = SensitiveFieldStore::new(inner);
        let user = EntityName::USER;
        let all = Criteria::new();
        let options = ReadOptions::default();

        let mut returned = store
            .find_many(&user, &all, &options)
            .await
            .expect("find_many");
        returned.extend(store.find_first(&user, &all, &options).await.expect("find_first"));
        returned.extend(store.find_unique(&user, &all).await.expect("find_unique"));
        returned.push(store.create(&user, stored_user()).await.expect("create"));
        returned.push(
            store
                .update(&user, &all, Record::new())
                .await
                .expect("update"),
        );
        returned.push(store.delete(&user, &all).await.expect("delete"));

        assert_eq!(returned.len(), 7);
        for record in returned {
            assert!(!record.contains_key(PASSWORD_FIELD));
            assert_eq!(record.get("email"), Some(&json!("ada@example.com")));
        }
    }

    #[rstest]
    #[tokio::test]
    async fn other_entities_keep_their_fields() {
        let mut inner = MockRecordStore::new();
        inner
            .expect_find_unique()
            .returning(|_, _| Ok(Some(stored_user())));
        let store = SensitiveFieldStore::new(inner);

        let record = store
            .find_unique(&EntityName::new("Credential"), &Criteria::new())
            .await
            .expect("find_unique")
            .expect("record present");
        assert!(record.contains_key(PASSWORD_FIELD));
    }
}
