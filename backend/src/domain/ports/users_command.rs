//! Driving port for user writes.

use async_trait::async_trait;

use crate::domain::{AppError, NewUser, User, UserChanges, UserId};

/// Domain use-case port for creating, changing and removing users.
///
/// `delete` is a soft delete; `purge` removes the row and is reserved for
/// administrative clean-up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersCommand: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, AppError>;

    async fn delete(&self, id: UserId) -> Result<(), AppError>;

    /// Clear `deletedAt` on a soft-deleted user and return it.
    async fn restore(&self, id: UserId) -> Result<User, AppError>;

    async fn purge(&self, id: UserId) -> Result<(), AppError>;
}
