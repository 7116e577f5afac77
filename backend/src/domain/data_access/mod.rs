//! Data-access policy layer.
//!
//! Services never talk to a persistence adapter directly. They go through a
//! stack of [`RecordStore`](crate::domain::ports::RecordStore) decorators:
//!
//! - [`SoftDeleteStore`] rewrites reads and deletes on soft-deletable
//!   entities according to [`SoftDeletePolicy`].
//! - [`SensitiveFieldStore`] strips the user password from every returned
//!   record.
//!
//! Both are stateless per call, so concurrent requests share one stack.

mod criteria;
mod policy;
mod sensitive_fields;
mod soft_delete;

pub use criteria::{
    Condition, Criteria, EntityName, OrderBy, ReadOptions, Record, SortDirection, compare_values,
};
pub use policy::{
    DELETED_AT, DataAccessCall, OperationKind, SoftDeleteAllowList, SoftDeletePolicy,
    deleted_at_cleared, deleted_at_stamp, exclude_deleted,
};
pub use sensitive_fields::{PASSWORD_FIELD, SensitiveFieldStore};
pub use soft_delete::SoftDeleteStore;
