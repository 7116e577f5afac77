//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{DatabaseProbe, UsersCommand, UsersQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub users: Arc<dyn UsersQuery>,
    pub users_command: Arc<dyn UsersCommand>,
    pub database: Arc<dyn DatabaseProbe>,
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Construct state from its ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use b2b_api::domain::UsersService;
    /// use b2b_api::domain::data_access::SoftDeleteStore;
    /// use b2b_api::domain::ports::{FixtureDatabaseProbe, FixturePasswordHasher};
    /// use b2b_api::inbound::http::state::HttpState;
    /// use b2b_api::outbound::persistence::InMemoryRecordStore;
    /// use mockable::DefaultClock;
    ///
    /// let store = SoftDeleteStore::new(InMemoryRecordStore::default(), Arc::new(DefaultClock));
    /// let users = Arc::new(UsersService::new(Arc::new(store), Arc::new(FixturePasswordHasher)));
    /// let state = HttpState::new(
    ///     users.clone(),
    ///     users,
    ///     Arc::new(FixtureDatabaseProbe),
    ///     Arc::new(DefaultClock),
    /// );
    /// let _users = state.users.clone();
    /// ```
    pub fn new(
        users: Arc<dyn UsersQuery>,
        users_command: Arc<dyn UsersCommand>,
        database: Arc<dyn DatabaseProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            users_command,
            database,
            clock,
        }
    }
}
