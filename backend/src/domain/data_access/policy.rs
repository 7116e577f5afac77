//! Soft-delete rewriting of data-access calls.
//!
//! A [`DataAccessCall`] describes one store invocation. [`SoftDeletePolicy`]
//! rewrites it at most once before dispatch: reads on allow-listed entities
//! gain a `deletedAt IS NULL` condition and deletes become updates that stamp
//! `deletedAt`. The rewrite is a pure function of the call and the instant,
//! so it is tested without a store.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::criteria::{Condition, Criteria, EntityName, ReadOptions, Record};

/// Column stamped when a record is soft-deleted.
pub const DELETED_AT: &str = "deletedAt";

/// Store verb named by a [`DataAccessCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    FindMany,
    FindFirst,
    FindUnique,
    Count,
    Create,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
}

/// One data-access invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAccessCall {
    pub operation: OperationKind,
    pub entity: EntityName,
    pub criteria: Criteria,
    pub options: ReadOptions,
    /// Data written by create and update verbs.
    pub payload: Option<Record>,
}

impl DataAccessCall {
    /// Describe a call with no read options and no payload.
    pub fn new(operation: OperationKind, entity: EntityName, criteria: Criteria) -> Self {
        Self {
            operation,
            entity,
            criteria,
            options: ReadOptions::default(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Record) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Entity types opted into soft deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeleteAllowList(BTreeSet<EntityName>);

impl SoftDeleteAllowList {
    pub fn new(entities: impl IntoIterator<Item = EntityName>) -> Self {
        Self(entities.into_iter().collect())
    }

    pub fn contains(&self, entity: &EntityName) -> bool {
        self.0.contains(entity)
    }
}

impl Default for SoftDeleteAllowList {
    fn default() -> Self {
        Self::new([EntityName::USER])
    }
}

/// Rewrites calls on allow-listed entities.
#[derive(Debug, Clone, Default)]
pub struct SoftDeletePolicy {
    allow_list: SoftDeleteAllowList,
}

/// Payload stamping `deletedAt` with `now`.
pub fn deleted_at_stamp(now: DateTime<Utc>) -> Record {
    let mut payload = Record::new();
    payload.insert(
        DELETED_AT.to_owned(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload
}

/// Payload clearing `deletedAt`.
pub fn deleted_at_cleared() -> Record {
    let mut payload = Record::new();
    payload.insert(DELETED_AT.to_owned(), Value::Null);
    payload
}

/// Merge `deletedAt IS NULL` into `criteria`. Idempotent.
pub fn exclude_deleted(criteria: Criteria) -> Criteria {
    criteria.with_condition(DELETED_AT, Condition::IsNull)
}

impl SoftDeletePolicy {
    pub fn new(allow_list: SoftDeleteAllowList) -> Self {
        Self { allow_list }
    }

    /// Whether calls on `entity` are rewritten.
    pub fn applies_to(&self, entity: &EntityName) -> bool {
        self.allow_list.contains(entity)
    }

    /// Rewrite `call` for soft deletion, stamping deletes with `now`.
    ///
    /// Calls on entities outside the allow-list, and verbs other than the
    /// reads and deletes, are returned unchanged.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::data_access::{
    ///     Condition, Criteria, DataAccessCall, EntityName, OperationKind, SoftDeletePolicy,
    /// };
    /// use chrono::Utc;
    ///
    /// let call = DataAccessCall::new(OperationKind::FindUnique, EntityName::USER, Criteria::new());
    /// let rewritten = SoftDeletePolicy::default().rewrite(call, Utc::now());
    /// assert_eq!(rewritten.operation, OperationKind::FindFirst);
    /// assert_eq!(rewritten.criteria.condition("deletedAt"), Some(&Condition::IsNull));
    /// ```
    pub fn rewrite(&self, call: DataAccessCall, now: DateTime<Utc>) -> DataAccessCall {
        if !self.applies_to(&call.entity) {
            return call;
        }
        match call.operation {
            OperationKind::FindMany | OperationKind::FindFirst | OperationKind::Count => {
                DataAccessCall {
                    criteria: exclude_deleted(call.criteria),
                    ..call
                }
            }
            OperationKind::FindUnique => DataAccessCall {
                operation: OperationKind::FindFirst,
                criteria: exclude_deleted(call.criteria),
                ..call
            },
            OperationKind::Delete => DataAccessCall {
                operation: OperationKind::Update,
                payload: Some(deleted_at_stamp(now)),
                ..call
            },
            OperationKind::DeleteMany => DataAccessCall {
                operation: OperationKind::UpdateMany,
                payload: Some(deleted_at_stamp(now)),
                ..call
            },
            OperationKind::Create | OperationKind::Update | OperationKind::UpdateMany => call,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Pure rewrite rules.

    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn by_email() -> Criteria {
        Criteria::field("email", Condition::Equals(json!("ada@example.com")))
    }

    #[rstest]
    #[case(OperationKind::FindMany)]
    #[case(OperationKind::FindFirst)]
    #[case(OperationKind::Count)]
    fn reads_merge_deleted_at_filter(now: DateTime<Utc>, #[case] operation: OperationKind) {
        let call = DataAccessCall::new(operation, EntityName::USER, by_email());
        let rewritten = SoftDeletePolicy::default().rewrite(call, now);
        assert_eq!(rewritten.operation, operation);
        assert_eq!(
            rewritten.criteria.condition("email"),
            Some(&Condition::Equals(json!("ada@example.com")))
        );
        assert_eq!(
            rewritten.criteria.condition(DELETED_AT),
            Some(&Condition::IsNull)
        );
    }

    #[rstest]
    fn find_unique_becomes_filtered_find_first(now: DateTime<Utc>) {
        let call = DataAccessCall::new(OperationKind::FindUnique, EntityName::USER, by_email());
        let rewritten = SoftDeletePolicy::default().rewrite(call, now);
        assert_eq!(rewritten.operation, OperationKind::FindFirst);
        assert_eq!(rewritten.criteria, exclude_deleted(by_email()));
    }

    #[rstest]
    #[case(OperationKind::Delete, OperationKind::Update)]
    #[case(OperationKind::DeleteMany, OperationKind::UpdateMany)]
    fn deletes_become_timestamp_updates(
        now: DateTime<Utc>,
        #[case] operation: OperationKind,
        #[case] expected: OperationKind,
    ) {
        let call = DataAccessCall::new(operation, EntityName::USER, by_email());
        let rewritten = SoftDeletePolicy::default().rewrite(call, now);
        assert_eq!(rewritten.operation, expected);
        assert_eq!(rewritten.criteria, by_email());
        assert_eq!(
            rewritten.payload,
            Some(deleted_at_stamp(now)),
        );
        assert_eq!(
            rewritten
                .payload
                .as_ref()
                .and_then(|p| p.get(DELETED_AT))
                .and_then(Value::as_str),
            Some("2024-05-01T09:30:00.000Z")
        );
    }

    #[rstest]
    #[case(OperationKind::FindMany)]
    #[case(OperationKind::FindUnique)]
    #[case(OperationKind::Delete)]
    #[case(OperationKind::DeleteMany)]
    fn entities_outside_allow_list_pass_through(
        now: DateTime<Utc>,
        #[case] operation: OperationKind,
    ) {
        let call = DataAccessCall::new(operation, EntityName::new("AuditLog"), by_email());
        let rewritten = SoftDeletePolicy::default().rewrite(call.clone(), now);
        assert_eq!(rewritten, call);
    }

    #[rstest]
    fn writes_are_not_rewritten(now: DateTime<Utc>) {
        let call = DataAccessCall::new(OperationKind::Update, EntityName::USER, by_email())
            .with_payload(deleted_at_cleared());
        let rewritten = SoftDeletePolicy::default().rewrite(call.clone(), now);
        assert_eq!(rewritten, call);
    }

    #[rstest]
    fn merging_the_filter_twice_is_idempotent(now: DateTime<Utc>) {
        let policy = SoftDeletePolicy::default();
        let call = DataAccessCall::new(OperationKind::FindMany, EntityName::USER, by_email());
        let once = policy.rewrite(call, now);
        let twice = policy.rewrite(once.clone(), now);
        assert_eq!(once.criteria, twice.criteria);
    }

    #[rstest]
    fn allow_list_can_name_other_entities(now: DateTime<Utc>) {
        let policy = SoftDeletePolicy::new(SoftDeleteAllowList::new([EntityName::new("Invoice")]));
        let invoice = DataAccessCall::new(
            OperationKind::Delete,
            EntityName::new("Invoice"),
            Criteria::new(),
        );
        let user = DataAccessCall::new(OperationKind::Delete, EntityName::USER, Criteria::new());
        assert_eq!(policy.rewrite(invoice, now).operation, OperationKind::Update);
        assert_eq!(policy.rewrite(user, now).operation, OperationKind::Delete);
    }
}
