//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod database_probe;
mod password_hasher;
mod record_store;
mod users_command;
mod users_query;

#[cfg(test)]
pub use database_probe::MockDatabaseProbe;
pub use database_probe::{DatabaseProbe, DatabaseProbeError, FixtureDatabaseProbe};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{FixturePasswordHasher, PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use record_store::MockRecordStore;
pub use record_store::{RecordStore, SoftDeletingStore};
#[cfg(test)]
pub use users_command::MockUsersCommand;
pub use users_command::UsersCommand;
#[cfg(test)]
pub use users_query::MockUsersQuery;
pub use users_query::UsersQuery;

#[cfg(test)]
mod tests;
