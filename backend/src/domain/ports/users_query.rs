//! Driving port for user reads.
//!
//! Inbound adapters (HTTP handlers) use this port to fetch users without
//! importing persistence concerns. Only users that have not been soft
//! deleted are visible.

use async_trait::async_trait;
use pagination::Paginated;

use crate::domain::{AppError, User, UserId, UserListQuery};

/// Domain use-case port for reading users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersQuery: Send + Sync {
    /// One page of users matching `query`.
    async fn list(&self, query: UserListQuery) -> Result<Paginated<User>, AppError>;

    /// The user with `id`, failing with a 404 when absent or deleted.
    async fn get(&self, id: UserId) -> Result<User, AppError>;
}
