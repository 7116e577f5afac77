//! Builders for the HTTP state and the persistence stack behind it.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::UsersService;
use crate::domain::data_access::{SensitiveFieldStore, SoftDeleteStore};
use crate::domain::ports::{DatabaseProbe, FixtureDatabaseProbe, RecordStore};
use crate::inbound::http::state::HttpState;
use crate::outbound::persistence::{DieselDatabaseProbe, DieselUserStore, InMemoryRecordStore};
use crate::outbound::security::Argon2PasswordHasher;

use super::ServerConfig;

/// Wrap `store` in the data-access policy stack and expose the users
/// service through both driving ports.
///
/// Password stripping sits beneath the soft-delete layer so the unfiltered
/// path used by purges is stripped too.
pub fn build_users_state<S>(store: S, database: Arc<dyn DatabaseProbe>, clock: Arc<dyn Clock>) -> HttpState
where
    S: RecordStore + 'static,
{
    let policy_stack = SoftDeleteStore::new(SensitiveFieldStore::new(store), Arc::clone(&clock));
    let service = Arc::new(UsersService::new(
        Arc::new(policy_stack),
        Arc::new(Argon2PasswordHasher::new()),
    ));
    HttpState::new(service.clone(), service, database, clock)
}

/// Build the HTTP state from `config`: Diesel-backed when a pool is
/// attached, in-memory otherwise.
pub fn build_http_state(config: &ServerConfig) -> HttpState {
    let clock = Arc::clone(&config.clock);
    match &config.db_pool {
        Some(pool) => build_users_state(
            DieselUserStore::new(pool.clone(), Arc::clone(&clock)),
            Arc::new(DieselDatabaseProbe::new(pool.clone())),
            clock,
        ),
        None => build_users_state(
            InMemoryRecordStore::new(Arc::clone(&clock)),
            Arc::new(FixtureDatabaseProbe),
            clock,
        ),
    }
}
