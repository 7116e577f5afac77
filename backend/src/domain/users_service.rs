//! Users domain service.
//!
//! Implements the [`UsersQuery`] and [`UsersCommand`] driving ports on top of
//! a [`SoftDeletingStore`]. The store is expected to be the full policy
//! stack, so reads here never mention `deletedAt` and deletes are soft
//! without the service asking for it.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Paginated;
use serde_json::json;
use tracing::info;

use crate::domain::data_access::{Condition, Criteria, EntityName, exclude_deleted};
use crate::domain::ports::{PasswordHasher, SoftDeletingStore, UsersCommand, UsersQuery};
use crate::domain::{
    AppError, DataErrorCode, DataLayerError, HttpException, NewUser, User, UserChanges, UserId,
    UserListQuery,
};

/// Users service implementing the driving ports.
pub struct UsersService<S: ?Sized, H: ?Sized> {
    store: Arc<S>,
    hasher: Arc<H>,
}

impl<S: ?Sized, H: ?Sized> Clone for UsersService<S, H> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<S: ?Sized, H: ?Sized> UsersService<S, H> {
    /// Create a new service over the given store and hasher.
    pub fn new(store: Arc<S>, hasher: Arc<H>) -> Self {
        Self { store, hasher }
    }
}

fn by_id(id: UserId) -> Criteria {
    Criteria::field("id", Condition::Equals(json!(id.to_string())))
}

fn user_not_found(id: UserId) -> AppError {
    HttpException::not_found(format!("User with id {id} not found")).into()
}

/// Report a missing row as a 404 naming the user; pass other failures on.
fn missing_as_not_found(id: UserId) -> impl FnOnce(DataLayerError) -> AppError {
    move |err| match err.code() {
        Some(DataErrorCode::RecordNotFound) => user_not_found(id),
        _ => err.into(),
    }
}

impl<S, H> UsersService<S, H>
where
    S: SoftDeletingStore + ?Sized,
    H: PasswordHasher + ?Sized,
{
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        self.hasher.hash(plaintext).map_err(AppError::from)
    }
}

#[async_trait]
impl<S, H> UsersQuery for UsersService<S, H>
where
    S: SoftDeletingStore + ?Sized,
    H: PasswordHasher + ?Sized,
{
    async fn list(&self, query: UserListQuery) -> Result<Paginated<User>, AppError> {
        let criteria = query.criteria();
        let total = self.store.count(&EntityName::USER, &criteria).await?;
        let records = self
            .store
            .find_many(&EntityName::USER, &criteria, &query.read_options())
            .await?;
        let users = records
            .into_iter()
            .map(User::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(users, total, query.page))
    }

    async fn get(&self, id: UserId) -> Result<User, AppError> {
        let record = self
            .store
            .find_unique(&EntityName::USER, &by_id(id))
            .await?
            .ok_or_else(|| user_not_found(id))?;
        Ok(User::from_record(record)?)
    }
}

#[async_trait]
impl<S, H> UsersCommand for UsersService<S, H>
where
    S: SoftDeletingStore + ?Sized,
    H: PasswordHasher + ?Sized,
{
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let hash = self.hash(&user.password)?;
        let record = self
            .store
            .create(&EntityName::USER, user.into_record(hash))
            .await?;
        let created = User::from_record(record)?;
        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, AppError> {
        let hash = changes
            .password
            .as_deref()
            .map(|password| self.hash(password))
            .transpose()?;
        let record = self
            .store
            .update(
                &EntityName::USER,
                &exclude_deleted(by_id(id)),
                changes.into_record(hash),
            )
            .await
            .map_err(missing_as_not_found(id))?;
        Ok(User::from_record(record)?)
    }

    async fn delete(&self, id: UserId) -> Result<(), AppError> {
        // Deleting an already deleted user must 404 rather than re-stamp it.
        self.get(id).await?;
        self.store
            .delete(&EntityName::USER, &by_id(id))
            .await
            .map_err(missing_as_not_found(id))?;
        info!(user_id = %id, "user soft deleted");
        Ok(())
    }

    async fn restore(&self, id: UserId) -> Result<User, AppError> {
        let restored = self.store.restore(&EntityName::USER, &by_id(id)).await?;
        if restored == 0 {
            return Err(
                HttpException::not_found(format!("Deleted user with id {id} not found")).into(),
            );
        }
        info!(user_id = %id, "user restored");
        self.get(id).await
    }

    async fn purge(&self, id: UserId) -> Result<(), AppError> {
        self.store
            .unfiltered()
            .delete(&EntityName::USER, &by_id(id))
            .await
            .map_err(missing_as_not_found(id))?;
        info!(user_id = %id, "user purged");
        Ok(())
    }
}

#[cfg(test)]
#[path = "users_service_tests.rs"]
mod tests;
